use console::{style, StyledObject};

fn styled(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string())
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright()
}

pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).dim()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).magenta().bold()
}

/// A completion rate colored by the 90/75 legend: green when the sprint
/// delivered at least 90% of its commitment, yellow down to 75%, red below.
pub fn completion_percent(rate: f64) -> StyledObject<String> {
    let text = format!("{rate:.1}%");
    if rate >= 90.0 {
        bright_green(text)
    } else if rate >= 75.0 {
        bright_yellow(text)
    } else {
        bright_red(text)
    }
}
