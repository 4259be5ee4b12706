//! Race time value type and its human-readable rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::GameVariant;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Elapsed race time in milliseconds.
///
/// # Examples
/// ```
/// use replayboard::domain::{GameVariant, RaceTime};
///
/// let time = RaceTime::from_millis(61_234);
/// assert_eq!(time.display(GameVariant::Legacy), "01:01.23");
/// assert_eq!(time.display(GameVariant::Modern), "01:01.234");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceTime(u32);

impl RaceTime {
    /// Wrap a millisecond count.
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    /// Milliseconds elapsed.
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Render as `H:MM:SS.ff`, dropping a zero hour component.
    ///
    /// Legacy replays show hundredths, modern replays thousandths. Exact
    /// seconds always render with a `.00` suffix.
    pub fn display(self, variant: GameVariant) -> String {
        let millis = u64::from(self.0);
        let hours = millis / MILLIS_PER_HOUR;
        let minutes = (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let seconds = (millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let remainder = millis % MILLIS_PER_SECOND;

        let clock = if hours == 0 {
            format!("{minutes:02}:{seconds:02}")
        } else {
            format!("{hours}:{minutes:02}:{seconds:02}")
        };
        let fraction = match (remainder, variant) {
            (0, _) => "00".to_owned(),
            (_, GameVariant::Legacy) => format!("{:02}", remainder / 10),
            (_, GameVariant::Modern) => format!("{remainder:03}"),
        };
        format!("{clock}.{fraction}")
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::exact_seconds_legacy(30_000, GameVariant::Legacy, "00:30.00")]
    #[case::exact_seconds_modern(30_000, GameVariant::Modern, "00:30.00")]
    #[case::hundredths_truncate(61_239, GameVariant::Legacy, "01:01.23")]
    #[case::thousandths(61_239, GameVariant::Modern, "01:01.239")]
    #[case::sub_hundredth_legacy(45_007, GameVariant::Legacy, "00:45.00")]
    #[case::padded_thousandths(45_007, GameVariant::Modern, "00:45.007")]
    #[case::with_hours(3_723_450, GameVariant::Legacy, "1:02:03.45")]
    #[case::with_hours_exact(7_200_000, GameVariant::Modern, "2:00:00.00")]
    fn renders_race_times(#[case] millis: u32, #[case] variant: GameVariant, #[case] expected: &str) {
        assert_eq!(RaceTime::from_millis(millis).display(variant), expected);
    }

    #[rstest]
    fn orders_by_elapsed_time() {
        assert!(RaceTime::from_millis(30_000) < RaceTime::from_millis(31_000));
    }
}
