// Single-key operator console.
//
// Runs on a plain thread because crossterm's event read blocks. The key
// set mirrors the shorthand the bench scripts always used: e extend,
// r retract, s (or space) stop, a toggle active, h retract-home,
// x extend-home, p print positions, q quit.

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::messages::{ConsoleRequest, MotionCommand};

pub fn spawn(tx: mpsc::Sender<ConsoleRequest>) {
    std::thread::spawn(move || {
        if let Err(e) = run(tx) {
            warn!("console unavailable: {e}");
        }
    });
}

fn run(tx: mpsc::Sender<ConsoleRequest>) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    info!("console ready: e/r/s move, a active, h/x home, p positions, q quit");

    // mirrors the flag the runtime starts with
    let mut active = true;
    loop {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };

        let request = match code {
            KeyCode::Char('e') => ConsoleRequest::Motion(MotionCommand::Extend),
            KeyCode::Char('r') => ConsoleRequest::Motion(MotionCommand::Retract),
            KeyCode::Char('s') | KeyCode::Char(' ') => {
                ConsoleRequest::Motion(MotionCommand::Stop)
            }
            KeyCode::Char('a') => {
                active = !active;
                ConsoleRequest::Motion(MotionCommand::Activate(active))
            }
            KeyCode::Char('h') => ConsoleRequest::RetractHome,
            KeyCode::Char('x') => ConsoleRequest::ExtendHome,
            KeyCode::Char('p') => ConsoleRequest::PrintPositions,
            KeyCode::Char('q') | KeyCode::Esc => {
                let _ = tx.blocking_send(ConsoleRequest::Quit);
                break;
            }
            _ => continue,
        };
        if tx.blocking_send(request).is_err() {
            break;
        }
    }
    terminal::disable_raw_mode()
}
