//! Announcement requests
//!
//! Every spoken announcement is one of these variants. The clip key, the
//! fallback phrase and the accompanying sound all derive from the variant.

use super::clips::normalize_key;
use super::effects::SoundEffect;
use crate::sim::Lane;

/// How strongly an announcement holds the voice lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Object announcements; replaced by anything newer
    Object,
    /// Level flow and outcomes; only replaced by other terminal announcements
    Terminal,
}

/// A request for the announcer's voice lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementRequest {
    AnnounceObject { lane: Lane, speech: String },
    LevelIntro { level: u32, description: String },
    Countdown { value: u32 },
    LevelComplete { level: u32, score: i64 },
    GameOver { score: i64 },
}

impl AnnouncementRequest {
    pub fn priority(&self) -> Priority {
        match self {
            AnnouncementRequest::AnnounceObject { .. } => Priority::Object,
            _ => Priority::Terminal,
        }
    }

    /// Symbolic key of the pre-recorded clip for this request
    pub fn clip_key(&self) -> String {
        match self {
            AnnouncementRequest::AnnounceObject { lane, speech } => {
                format!("announce_{}_{}", lane.as_str(), normalize_key(speech))
            }
            AnnouncementRequest::LevelIntro { level, .. } => format!("level_intro_{level}"),
            AnnouncementRequest::Countdown { value: 0 } => "countdown_go".to_string(),
            AnnouncementRequest::Countdown { value } => format!("countdown_{value}"),
            AnnouncementRequest::LevelComplete { .. } => "level_complete".to_string(),
            AnnouncementRequest::GameOver { .. } => "game_over".to_string(),
        }
    }

    /// Text for the speech synthesizer when no clip exists
    pub fn phrase(&self) -> String {
        match self {
            AnnouncementRequest::AnnounceObject { lane, speech } => {
                format!("{}, {}", lane.as_str(), speech)
            }
            AnnouncementRequest::LevelIntro { description, .. } => description.clone(),
            AnnouncementRequest::Countdown { value: 0 } => "Go!".to_string(),
            AnnouncementRequest::Countdown { value } => value.to_string(),
            AnnouncementRequest::LevelComplete { level, score } => {
                format!("Level {level} complete! Score {score}.")
            }
            AnnouncementRequest::GameOver { score } => format!("Game over. Final score {score}."),
        }
    }

    /// Sound played on the voice lane before the phrase
    pub fn lead_in(&self) -> Option<SoundEffect> {
        match self {
            AnnouncementRequest::AnnounceObject { lane, .. } => Some(SoundEffect::LaneCue(*lane)),
            AnnouncementRequest::LevelComplete { .. } => Some(SoundEffect::Success),
            AnnouncementRequest::GameOver { .. } => Some(SoundEffect::GameOver),
            AnnouncementRequest::LevelIntro { .. } | AnnouncementRequest::Countdown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_and_phrase() {
        let req = AnnouncementRequest::AnnounceObject {
            lane: Lane::Left,
            speech: "plus 3".into(),
        };
        assert_eq!(req.clip_key(), "announce_left_plus_3");
        assert_eq!(req.phrase(), "left, plus 3");
        assert_eq!(req.priority(), Priority::Object);
        assert_eq!(req.lead_in(), Some(SoundEffect::LaneCue(Lane::Left)));
    }

    #[test]
    fn test_divided_by_key() {
        let req = AnnouncementRequest::AnnounceObject {
            lane: Lane::Right,
            speech: "divided by 2".into(),
        };
        assert_eq!(req.clip_key(), "announce_right_divided_by_2");
    }

    #[test]
    fn test_countdown() {
        assert_eq!(AnnouncementRequest::Countdown { value: 0 }.clip_key(), "countdown_go");
        assert_eq!(AnnouncementRequest::Countdown { value: 0 }.phrase(), "Go!");
        assert_eq!(AnnouncementRequest::Countdown { value: 3 }.clip_key(), "countdown_3");
        assert_eq!(AnnouncementRequest::Countdown { value: 3 }.phrase(), "3");
    }

    #[test]
    fn test_outcomes() {
        let done = AnnouncementRequest::LevelComplete { level: 2, score: 21 };
        assert_eq!(done.clip_key(), "level_complete");
        assert_eq!(done.phrase(), "Level 2 complete! Score 21.");
        assert_eq!(done.priority(), Priority::Terminal);
        assert_eq!(done.lead_in(), Some(SoundEffect::Success));

        let over = AnnouncementRequest::GameOver { score: -21 };
        assert_eq!(over.clip_key(), "game_over");
        assert_eq!(over.phrase(), "Game over. Final score -21.");
        assert_eq!(over.lead_in(), Some(SoundEffect::GameOver));
    }

    #[test]
    fn test_level_intro() {
        let intro = AnnouncementRequest::LevelIntro {
            level: 2,
            description: "Level 2. Reach 20.".into(),
        };
        assert_eq!(intro.clip_key(), "level_intro_2");
        assert_eq!(intro.phrase(), "Level 2. Reach 20.");
        assert_eq!(intro.lead_in(), None);
    }
}
