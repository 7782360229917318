use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("invalid grade class {0:?}, expected <grade>.<room> with grade 10-12 and room 1-9")]
    InvalidGradeClass(String),

    #[error("unknown religion: {0}")]
    UnknownReligion(String),
}

//
// ─── RELIGION ──────────────────────────────────────────────────────────────────
//

/// Religion recorded at registration. Selects the religion exam variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Religion {
    Islam,
    Christian,
}

impl Religion {
    /// Stable key used in storage and question file names.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Religion::Islam => "islam",
            Religion::Christian => "kristen",
        }
    }
}

impl fmt::Display for Religion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Religion::Islam => "Islam",
            Religion::Christian => "Christian",
        })
    }
}

impl FromStr for Religion {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "islam" => Ok(Religion::Islam),
            "kristen" | "christian" => Ok(Religion::Christian),
            other => Err(ProfileError::UnknownReligion(other.to_owned())),
        }
    }
}

//
// ─── GRADE CLASS ───────────────────────────────────────────────────────────────
//

/// School class such as `11.5`: grade 10-12, room 1-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GradeClass {
    grade: u8,
    room: u8,
}

impl GradeClass {
    pub const GRADES: [u8; 3] = [10, 11, 12];
    pub const ROOMS: u8 = 9;

    /// # Errors
    ///
    /// Returns `ProfileError::InvalidGradeClass` for grades outside 10-12 or rooms outside 1-9.
    pub fn new(grade: u8, room: u8) -> Result<Self, ProfileError> {
        if Self::GRADES.contains(&grade) && (1..=Self::ROOMS).contains(&room) {
            Ok(Self { grade, room })
        } else {
            Err(ProfileError::InvalidGradeClass(format!("{grade}.{room}")))
        }
    }

    /// The grade part, which selects the question folder.
    #[must_use]
    pub fn grade(self) -> u8 {
        self.grade
    }

    #[must_use]
    pub fn room(self) -> u8 {
        self.room
    }

    /// Every selectable class, `10.1` through `12.9`.
    pub fn all() -> impl Iterator<Item = GradeClass> {
        Self::GRADES
            .into_iter()
            .flat_map(|grade| (1..=Self::ROOMS).map(move |room| GradeClass { grade, room }))
    }
}

impl Default for GradeClass {
    fn default() -> Self {
        Self { grade: 10, room: 1 }
    }
}

impl fmt::Display for GradeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.grade, self.room)
    }
}

impl FromStr for GradeClass {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProfileError::InvalidGradeClass(s.to_owned());
        let (grade, room) = s.trim().split_once('.').ok_or_else(invalid)?;
        let grade = grade.parse::<u8>().map_err(|_| invalid())?;
        let room = room.parse::<u8>().map_err(|_| invalid())?;
        Self::new(grade, room).map_err(|_| invalid())
    }
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// Exam subjects offered on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Mathematics,
    Physics,
    Chemistry,
    Biology,
    Indonesian,
    English,
    Civics,
    Sociology,
    Economics,
    Geography,
    History,
    AdvancedMathematics,
    PhysicalEducation,
    Religion,
}

impl Subject {
    pub const ALL: [Subject; 14] = [
        Subject::Mathematics,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::Indonesian,
        Subject::English,
        Subject::Civics,
        Subject::Sociology,
        Subject::Economics,
        Subject::Geography,
        Subject::History,
        Subject::AdvancedMathematics,
        Subject::PhysicalEducation,
        Subject::Religion,
    ];

    /// Stable key used for storage and CLI lookup.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Subject::Mathematics => "matematika",
            Subject::Physics => "fisika",
            Subject::Chemistry => "kimia",
            Subject::Biology => "biologi",
            Subject::Indonesian => "bahasa_indonesia",
            Subject::English => "bahasa_inggris",
            Subject::Civics => "pkn",
            Subject::Sociology => "sosiologi",
            Subject::Economics => "ekonomi",
            Subject::Geography => "geografi",
            Subject::History => "sejarah",
            Subject::AdvancedMathematics => "matematika_lanjut",
            Subject::PhysicalEducation => "olahraga",
            Subject::Religion => "agama",
        }
    }

    /// Question file stem for this subject. The religion exam is split per religion.
    #[must_use]
    pub fn file_stem(self, religion: Religion) -> String {
        match self {
            Subject::Religion => format!("agama_{}", religion.key()),
            other => other.key().to_owned(),
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Subject::Mathematics => "Mathematics",
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
            Subject::Indonesian => "Indonesian",
            Subject::English => "English",
            Subject::Civics => "Civics",
            Subject::Sociology => "Sociology",
            Subject::Economics => "Economics",
            Subject::Geography => "Geography",
            Subject::History => "History",
            Subject::AdvancedMathematics => "Advanced Mathematics",
            Subject::PhysicalEducation => "Physical Education",
            Subject::Religion => "Religion",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Subject {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| {
                subject.key().eq_ignore_ascii_case(needle)
                    || subject.title().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| ProfileError::UnknownSubject(needle.to_owned()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_class_parses_and_formats() {
        let class: GradeClass = "11.5".parse().unwrap();
        assert_eq!(class.grade(), 11);
        assert_eq!(class.room(), 5);
        assert_eq!(class.to_string(), "11.5");
    }

    #[test]
    fn grade_class_rejects_out_of_range() {
        assert!("9.1".parse::<GradeClass>().is_err());
        assert!("10.0".parse::<GradeClass>().is_err());
        assert!("12".parse::<GradeClass>().is_err());
    }

    #[test]
    fn there_are_27_classes() {
        assert_eq!(GradeClass::all().count(), 27);
    }

    #[test]
    fn religion_subject_uses_religion_file() {
        assert_eq!(Subject::Religion.file_stem(Religion::Islam), "agama_islam");
        assert_eq!(
            Subject::Religion.file_stem(Religion::Christian),
            "agama_kristen"
        );
        assert_eq!(Subject::Physics.file_stem(Religion::Islam), "fisika");
    }

    #[test]
    fn subject_parses_from_key_or_title() {
        assert_eq!("pkn".parse::<Subject>().unwrap(), Subject::Civics);
        assert_eq!(
            "advanced mathematics".parse::<Subject>().unwrap(),
            Subject::AdvancedMathematics
        );
        assert!("astrology".parse::<Subject>().is_err());
    }
}
