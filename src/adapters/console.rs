//! Serial console.
//!
//! A reader thread blocks on stdin (the UART / USB console on ESP-IDF),
//! parses each line with [`AppCommand::parse_line`] and queues the result.
//! The super-loop drains the queue with [`take_command`] between scheduler
//! callbacks, so commands run on the main task like everything else.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;
use log::{info, warn};

use crate::app::commands::AppCommand;
use crate::error::Error;

const COMMAND_QUEUE_CAP: usize = 4;

static COMMANDS: Mutex<RefCell<Deque<AppCommand, COMMAND_QUEUE_CAP>>> =
    Mutex::new(RefCell::new(Deque::new()));

/// Parse a console line and queue the command.
pub fn submit_line(line: &str) -> Result<(), Error> {
    let cmd = AppCommand::parse_line(line)?;
    critical_section::with(|cs| COMMANDS.borrow_ref_mut(cs).push_back(cmd))
        .map_err(|_| Error::Command("console queue full"))
}

/// Next queued command, if any.
pub fn take_command() -> Option<AppCommand> {
    critical_section::with(|cs| COMMANDS.borrow_ref_mut(cs).pop_front())
}

/// Start the stdin reader thread.
pub fn spawn_reader() -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4096)
        .spawn(|| {
            let mut line = std::string::String::new();
            loop {
                line.clear();
                match std::io::stdin().read_line(&mut line) {
                    Ok(0) => std::thread::sleep(std::time::Duration::from_millis(100)),
                    Ok(_) if line.trim().is_empty() => {}
                    Ok(_) => match submit_line(&line) {
                        Ok(()) => info!("CONSOLE | accepted '{}'", line.trim()),
                        Err(e) => warn!("CONSOLE | {}", e),
                    },
                    Err(e) => {
                        warn!("CONSOLE | read failed: {}", e);
                        std::thread::sleep(std::time::Duration::from_millis(100));
                    }
                }
            }
        })?;
    Ok(())
}
