//! Campaign season detection from track names.
//!
//! Official campaign tracks are named `<Season> <Year> - <NN>`, for example
//! `Summer 2023 - 07`.

use std::fmt;

use super::TrackId;

/// Quarter of a campaign year, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeasonPeriod {
    /// January to March.
    Winter,
    /// April to June.
    Spring,
    /// July to September.
    Summer,
    /// October to December.
    Fall,
}

impl SeasonPeriod {
    /// Name as it appears in track ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall => "Fall",
        }
    }

    /// Period named exactly `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Winter" => Some(Self::Winter),
            "Spring" => Some(Self::Spring),
            "Summer" => Some(Self::Summer),
            "Fall" => Some(Self::Fall),
            _ => None,
        }
    }
}

/// A campaign season; later seasons compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Season {
    /// Campaign year.
    pub year: u32,
    /// Quarter within the year.
    pub period: SeasonPeriod,
}

impl Season {
    /// Season of a campaign track, or `None` for any other track.
    pub fn of_track(track_id: &TrackId) -> Option<Self> {
        let mut words = track_id.as_str().split(' ');
        let period = SeasonPeriod::from_name(words.next()?)?;
        let year = words.next()?.parse().ok()?;
        words.next()?;
        Some(Self { year, period })
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.period.as_str(), self.year)
    }
}

/// Most recent season across `track_ids`.
///
/// Returns `None` for an empty collection or as soon as one id is not a
/// campaign track.
///
/// # Examples
///
/// ```
/// # use replayboard::domain::{latest_season, TrackId};
/// let tracks = [TrackId::new("Fall 2023 - 01"), TrackId::new("Winter 2024 - 10")];
/// assert_eq!(
///     latest_season(&tracks).map(|season| season.to_string()),
///     Some("Winter 2024".to_owned())
/// );
/// ```
pub fn latest_season<'a>(track_ids: impl IntoIterator<Item = &'a TrackId>) -> Option<Season> {
    let mut latest: Option<Season> = None;
    for track_id in track_ids {
        let season = Season::of_track(track_id)?;
        latest = latest.max(Some(season));
    }
    latest
}
