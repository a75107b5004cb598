//! Weekly subject timings and the conflict rules between them.
//!
//! A [`Timing`] is a set of weekdays plus a half-open `[start, end)` time of
//! day. Two timings conflict when they share at least one weekday and
//! `a.start < b.end && b.start < a.end`. Touching slots (one ends exactly when
//! the other starts) do not conflict.
//!
//! Subjects are validated in two passes: the candidate timings against each
//! other ([`check_internal`]), then against every subject already taught in
//! each target class ([`check_against_class`]). The first conflict wins.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Invalid time '{0}'. Use HH:MM (00:00-23:59) or hh:mm AM/PM")]
    InvalidTime(String),

    #[error("Invalid day '{0}'. Use Mon, Tue, Wed, Thu, Fri, Sat or Sun")]
    InvalidDay(String),

    #[error("Each timing needs at least one day")]
    NoDays,

    #[error("Timing end {end} must be after start {start}")]
    EmptyRange { start: TimeOfDay, end: TimeOfDay },

    #[error("Timing overlap in new subject for {days}")]
    InternalOverlap { days: String },

    #[error("Conflict in {class_key}: Timing overlaps on {days} with {subject}")]
    ClassConflict {
        class_key: String,
        days: String,
        subject: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub fn label(self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Ok(Weekday::Mon),
            "tue" | "tues" | "tuesday" => Ok(Weekday::Tue),
            "wed" | "wednesday" => Ok(Weekday::Wed),
            "thu" | "thur" | "thurs" | "thursday" => Ok(Weekday::Thu),
            "fri" | "friday" => Ok(Weekday::Fri),
            "sat" | "saturday" => Ok(Weekday::Sat),
            "sun" | "sunday" => Ok(Weekday::Sun),
            _ => Err(ScheduleError::InvalidDay(s.to_string())),
        }
    }
}

impl TryFrom<String> for Weekday {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Weekday> for String {
    fn from(day: Weekday) -> Self {
        day.label().to_string()
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self(hour * 60 + minute))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.0 / 60), u32::from(self.0 % 60), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

/// Accepts `HH:MM` (24-hour) and `hh:mm AM|PM` (12-hour, case-insensitive).
impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let (h, m) = clock.split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
            return Err(invalid());
        }

        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;

        let hour = match meridiem {
            None => hour,
            Some(_) if !(1..=12).contains(&hour) => return Err(invalid()),
            Some(false) => hour % 12,
            Some(true) => hour % 12 + 12,
        };

        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Wire shape of a timing: `{"days": ["Mon"], "time": {"start": "09:00", "end": "10:00"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimingDto {
    #[schema(example = json!(["Mon", "Wed"]))]
    pub days: Vec<String>,
    pub time: TimeRangeDto,
}

/// Times of day within one calendar day. `24:00` is not accepted, so a
/// slot running to midnight ends at `23:59` (or `11:59 PM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeRangeDto {
    #[schema(example = "09:00")]
    pub start: String,
    #[schema(example = "10:30")]
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    days: Vec<Weekday>,
    start: TimeOfDay,
    end: TimeOfDay,
}

impl Timing {
    pub fn new<I>(days: I, start: TimeOfDay, end: TimeOfDay) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        let days: Vec<Weekday> = days.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if days.is_empty() {
            return Err(ScheduleError::NoDays);
        }
        if end <= start {
            return Err(ScheduleError::EmptyRange { start, end });
        }
        Ok(Self { days, start, end })
    }

    pub fn parse(dto: &TimingDto) -> Result<Self, ScheduleError> {
        let days = dto
            .days
            .iter()
            .map(|d| d.parse::<Weekday>())
            .collect::<Result<Vec<_>, _>>()?;
        let start: TimeOfDay = dto.time.start.parse()?;
        let end: TimeOfDay = dto.time.end.parse()?;
        Self::new(days, start, end)
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    pub fn overlaps_in_time(&self, other: &Timing) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Weekdays on which `self` and `other` collide; empty when they don't.
    pub fn conflict_days(&self, other: &Timing) -> Vec<Weekday> {
        if !self.overlaps_in_time(other) {
            return Vec::new();
        }
        self.days
            .iter()
            .copied()
            .filter(|d| other.days.contains(d))
            .collect()
    }

    /// `"09:00 - 10:30"`
    pub fn slot_label(&self) -> String {
        format!("{} - {}", self.start, self.end)
    }

    pub fn to_dto(&self) -> TimingDto {
        TimingDto {
            days: self.days.iter().map(|d| d.label().to_string()).collect(),
            time: TimeRangeDto {
                start: self.start.to_string(),
                end: self.end.to_string(),
            },
        }
    }
}

/// A timing that already belongs to a persisted subject.
#[derive(Debug, Clone)]
pub struct ExistingTiming {
    pub subject: String,
    pub timing: Timing,
}

pub fn parse_timings(dtos: &[TimingDto]) -> Result<Vec<Timing>, ScheduleError> {
    dtos.iter().map(Timing::parse).collect()
}

fn join_days(days: &[Weekday]) -> String {
    days.iter().map(|d| d.label()).collect::<Vec<_>>().join(", ")
}

/// Rejects a candidate set whose own timings collide.
pub fn check_internal(candidate: &[Timing]) -> Result<(), ScheduleError> {
    for (i, a) in candidate.iter().enumerate() {
        for b in &candidate[i + 1..] {
            let days = a.conflict_days(b);
            if !days.is_empty() {
                return Err(ScheduleError::InternalOverlap {
                    days: join_days(&days),
                });
            }
        }
    }
    Ok(())
}

/// Rejects a candidate set that collides with a subject already taught in `class_key`.
pub fn check_against_class(
    class_key: &str,
    candidate: &[Timing],
    existing: &[ExistingTiming],
) -> Result<(), ScheduleError> {
    for new in candidate {
        for old in existing {
            let days = new.conflict_days(&old.timing);
            if !days.is_empty() {
                return Err(ScheduleError::ClassConflict {
                    class_key: class_key.to_string(),
                    days: join_days(&days),
                    subject: old.subject.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Runs both passes. `classes` pairs each target class key with the timings of
/// the other subjects taught there, in the order the classes were requested.
pub fn validate_schedule(
    candidate: &[Timing],
    classes: &[(String, Vec<ExistingTiming>)],
) -> Result<(), ScheduleError> {
    check_internal(candidate)?;
    for (class_key, existing) in classes {
        check_against_class(class_key, candidate, existing)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn timing(days: &[Weekday], start: &str, end: &str) -> Timing {
        Timing::new(days.iter().copied(), t(start), t(end)).unwrap()
    }

    fn existing(subject: &str, timing: Timing) -> ExistingTiming {
        ExistingTiming {
            subject: subject.to_string(),
            timing,
        }
    }

    use Weekday::*;

    #[test]
    fn test_parse_24_hour_times() {
        assert_eq!(t("09:00").minutes(), 540);
        assert_eq!(t("9:05").minutes(), 545);
        assert_eq!(t("00:00").minutes(), 0);
        assert_eq!(t("23:59").minutes(), 1439);
        assert_eq!(t(" 13:30 ").to_string(), "13:30");
    }

    #[test]
    fn test_parse_12_hour_times() {
        assert_eq!(t("09:00 AM"), t("09:00"));
        assert_eq!(t("1:30 pm"), t("13:30"));
        assert_eq!(t("12:15 AM"), t("00:15"));
        assert_eq!(t("12:00 PM"), t("12:00"));
        assert_eq!(t("11:59PM"), t("23:59"));
    }

    #[test]
    fn test_parse_rejects_malformed_times() {
        for input in [
            "", "25:00", "9:60", "13:00 PM", "0:30 AM", "0900", "9:5", "ab:cd", "09:00 XM", "-1:00",
            "09:00:00",
        ] {
            assert_eq!(
                input.parse::<TimeOfDay>(),
                Err(ScheduleError::InvalidTime(input.to_string())),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_midnight_end_must_be_written_as_last_minute() {
        let err = "24:00".parse::<TimeOfDay>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid time '24:00'. Use HH:MM (00:00-23:59) or hh:mm AM/PM"
        );
        assert_eq!(t("11:59 PM"), t("23:59"));
    }

    #[test]
    fn test_parse_weekdays() {
        assert_eq!("mon".parse::<Weekday>().unwrap(), Mon);
        assert_eq!("Thursday".parse::<Weekday>().unwrap(), Thu);
        assert_eq!(" SUN ".parse::<Weekday>().unwrap(), Sun);
        assert!(matches!(
            "Funday".parse::<Weekday>(),
            Err(ScheduleError::InvalidDay(_))
        ));
    }

    #[test]
    fn test_timing_requires_days_and_positive_length() {
        assert_eq!(
            Timing::new([], t("09:00"), t("10:00")),
            Err(ScheduleError::NoDays)
        );
        assert!(matches!(
            Timing::new([Mon], t("10:00"), t("10:00")),
            Err(ScheduleError::EmptyRange { .. })
        ));
        assert!(matches!(
            Timing::new([Mon], t("11:00"), t("10:00")),
            Err(ScheduleError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_timing_days_are_deduplicated_and_ordered() {
        let timing = timing(&[Fri, Mon, Fri, Wed], "09:00", "10:00");
        assert_eq!(timing.days(), &[Mon, Wed, Fri]);
    }

    #[test]
    fn test_parse_from_dto() {
        let dto = TimingDto {
            days: vec!["wed".into(), "Monday".into()],
            time: TimeRangeDto {
                start: "09:00 AM".into(),
                end: "10:30 AM".into(),
            },
        };
        let timing = Timing::parse(&dto).unwrap();
        assert_eq!(timing.days(), &[Mon, Wed]);
        assert_eq!(timing.slot_label(), "09:00 - 10:30");
        assert_eq!(timing.to_dto().days, vec!["Mon", "Wed"]);
        assert_eq!(timing.to_dto().time.end, "10:30");
    }

    #[test]
    fn test_overlap_on_shared_day() {
        let a = timing(&[Mon, Wed], "09:00", "10:30");
        let b = timing(&[Wed, Fri], "10:00", "11:00");
        assert_eq!(a.conflict_days(&b), vec![Wed]);
        assert_eq!(b.conflict_days(&a), vec![Wed]);
    }

    #[test]
    fn test_touching_slots_do_not_conflict() {
        let a = timing(&[Mon], "09:00", "10:00");
        let b = timing(&[Mon], "10:00", "11:00");
        assert!(a.conflict_days(&b).is_empty());
        assert!(b.conflict_days(&a).is_empty());
    }

    #[test]
    fn test_disjoint_days_do_not_conflict() {
        let a = timing(&[Mon, Wed], "09:00", "10:00");
        let b = timing(&[Tue, Thu], "09:00", "10:00");
        assert!(a.conflict_days(&b).is_empty());
    }

    #[test]
    fn test_containment_conflicts() {
        let outer = timing(&[Tue], "08:00", "12:00");
        let inner = timing(&[Tue], "09:00", "10:00");
        assert_eq!(outer.conflict_days(&inner), vec![Tue]);
    }

    #[test]
    fn test_internal_overlap_rejected() {
        let candidate = vec![
            timing(&[Mon], "09:00", "10:30"),
            timing(&[Mon], "10:00", "11:00"),
        ];
        let err = check_internal(&candidate).unwrap_err();
        assert_eq!(err.to_string(), "Timing overlap in new subject for Mon");
    }

    #[test]
    fn test_internal_overlap_lists_every_shared_day() {
        let candidate = vec![
            timing(&[Mon, Wed, Fri], "09:00", "10:00"),
            timing(&[Wed, Mon], "09:30", "10:30"),
        ];
        assert_eq!(
            check_internal(&candidate),
            Err(ScheduleError::InternalOverlap {
                days: "Mon, Wed".to_string()
            })
        );
    }

    #[test]
    fn test_internal_check_accepts_clean_set() {
        let candidate = vec![
            timing(&[Mon, Wed], "09:00", "10:00"),
            timing(&[Mon], "10:00", "11:00"),
            timing(&[Tue], "09:00", "10:00"),
        ];
        assert!(check_internal(&candidate).is_ok());
        assert!(check_internal(&[]).is_ok());
    }

    #[test]
    fn test_class_conflict_reports_class_days_and_subject() {
        let candidate = vec![timing(&[Tue, Thu], "11:00", "12:00")];
        let taken = vec![
            existing("Physics", timing(&[Mon], "11:00", "12:00")),
            existing("Chemistry", timing(&[Thu], "11:30", "12:30")),
        ];
        let err = check_against_class("2023-SE-IT-A-morning", &candidate, &taken).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Conflict in 2023-SE-IT-A-morning: Timing overlaps on Thu with Chemistry"
        );
    }

    #[test]
    fn test_disjoint_weekdays_from_existing_subject_accepted() {
        let candidate = vec![timing(&[Tue, Thu], "09:00", "10:00")];
        let taken = vec![existing("Maths", timing(&[Mon, Wed, Fri], "09:00", "10:00"))];
        assert!(check_against_class("2023-SE-IT-A-morning", &candidate, &taken).is_ok());
    }

    #[test]
    fn test_validate_schedule_runs_internal_check_first() {
        let candidate = vec![
            timing(&[Mon], "09:00", "10:00"),
            timing(&[Mon], "09:30", "10:30"),
        ];
        let classes = vec![(
            "2023-A-morning".to_string(),
            vec![existing("Maths", timing(&[Mon], "09:00", "10:00"))],
        )];
        assert!(matches!(
            validate_schedule(&candidate, &classes),
            Err(ScheduleError::InternalOverlap { .. })
        ));
    }

    #[test]
    fn test_validate_schedule_reports_first_conflicting_class() {
        let candidate = vec![timing(&[Fri], "14:00", "15:00")];
        let classes = vec![
            ("2023-A-morning".to_string(), vec![]),
            (
                "2023-B-evening".to_string(),
                vec![existing("Biology", timing(&[Fri], "13:00", "14:30"))],
            ),
            (
                "2023-C-morning".to_string(),
                vec![existing("History", timing(&[Fri], "14:00", "15:00"))],
            ),
        ];
        match validate_schedule(&candidate, &classes) {
            Err(ScheduleError::ClassConflict { class_key, subject, .. }) => {
                assert_eq!(class_key, "2023-B-evening");
                assert_eq!(subject, "Biology");
            }
            other => panic!("expected class conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_pairwise_overlap_is_symmetric_across_grid() {
        let slots = ["08:00", "09:00", "09:30", "10:00", "11:00"];
        for (i, s1) in slots.iter().enumerate() {
            for e1 in &slots[i + 1..] {
                for (j, s2) in slots.iter().enumerate() {
                    for e2 in &slots[j + 1..] {
                        let a = timing(&[Mon], s1, e1);
                        let b = timing(&[Mon], s2, e2);
                        let expected = t(s1) < t(e2) && t(s2) < t(e1);
                        assert_eq!(a.overlaps_in_time(&b), expected);
                        assert_eq!(a.overlaps_in_time(&b), b.overlaps_in_time(&a));
                    }
                }
            }
        }
    }

    #[test]
    fn test_naive_time_round_trip() {
        let time = t("17:45");
        assert_eq!(TimeOfDay::from(time.to_naive_time()), time);
    }
}
