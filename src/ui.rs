// UI layer: the foreground loop that drives a `Session`.
//
// Each turn calls `update`, redraws the session's text through an indicatif
// spinner bar and sleeps one tick. The loop never waits on background work,
// so the spinner keeps moving while the user authorizes in the browser.

use std::io::stdout;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::style::{style, Color, Stylize};
use crossterm::tty::IsTty;
use indicatif::{ProgressBar, ProgressStyle};

use crate::session::{Control, Event, Outcome, Session};

/// Time between two ticks of the loop.
pub const TICK: Duration = Duration::from_millis(100);

const FOREGROUND: Color = Color::Rgb { r: 0xFA, g: 0xFA, b: 0xFA };
const INFO_BACKGROUND: Color = Color::Rgb { r: 0x7F, g: 0x52, b: 0x83 };
const ERROR_BACKGROUND: Color = Color::Rgb { r: 0xEB, g: 0x1D, b: 0x36 };

/// Run `session` until it reaches a terminal state.
pub fn run(session: &mut Session) -> Result<()> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{wide_msg}")?);

    let mut event = Event::Tick;
    loop {
        match session.update(event) {
            Control::Terminal => break,
            Control::Resume => {
                event = Event::Resume;
                continue;
            }
            Control::Continue => event = Event::Tick,
        }
        bar.set_message(session.render());
        thread::sleep(TICK);
    }

    bar.finish_and_clear();
    Ok(())
}

/// The final message, coloured when stdout is a terminal.
pub fn styled_result(outcome: &Outcome) -> String {
    if !stdout().is_tty() {
        return outcome.text().to_string();
    }
    paint(outcome)
}

fn paint(outcome: &Outcome) -> String {
    let background = if outcome.is_failure() {
        ERROR_BACKGROUND
    } else {
        INFO_BACKGROUND
    };
    // Styled per line so the background does not bleed past line ends.
    outcome
        .text()
        .lines()
        .map(|line| style(line).with(FOREGROUND).on(background).bold().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
