//! Levels, grading thresholds and remarks derived from scores and XP.

/// XP needed to leave level `n` is `100 * n`.
pub const XP_STEP: u64 = 100;

/// Minimum passing mark (KKM), in percent.
pub const PASSING_PERCENT: f64 = 75.0;

/// Level reached with `xp` total experience.
///
/// Starting at level 1, each level `n` costs `100 * n` XP, so level `n` is
/// reached at a cumulative `50 * n * (n - 1)` XP.
#[must_use]
pub fn level_for_xp(xp: u64) -> u32 {
    let mut remaining = xp;
    let mut level: u32 = 1;
    while remaining >= XP_STEP * u64::from(level) {
        remaining -= XP_STEP * u64::from(level);
        level += 1;
    }
    level
}

/// Cumulative XP at which `level` is reached.
#[must_use]
pub fn xp_to_reach(level: u32) -> u64 {
    let n = u64::from(level.max(1));
    XP_STEP / 2 * n * (n - 1)
}

/// Score as a percentage of `total`. An empty exam scores 0.
#[must_use]
pub fn score_percent(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(score) / f64::from(total) * 100.0
}

#[must_use]
pub fn passed(percent: f64) -> bool {
    percent >= PASSING_PERCENT
}

/// Qualitative feedback bucket for a score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remark {
    /// 90 and above
    Outstanding,
    /// 80 and above
    VeryGood,
    /// 70 and above
    Good,
    /// 60 and above
    NearlyThere,
    NotYet,
}

impl Remark {
    #[must_use]
    pub fn for_percent(percent: f64) -> Self {
        if percent >= 90.0 {
            Remark::Outstanding
        } else if percent >= 80.0 {
            Remark::VeryGood
        } else if percent >= 70.0 {
            Remark::Good
        } else if percent >= 60.0 {
            Remark::NearlyThere
        } else {
            Remark::NotYet
        }
    }

    /// Short message for the result screen.
    #[must_use]
    pub fn headline(self) -> &'static str {
        match self {
            Remark::Outstanding => "Outstanding! You are brilliant!",
            Remark::VeryGood => "Very good! You are sharp!",
            Remark::Good => "Not bad! Keep improving!",
            Remark::NearlyThere => "Almost passed! Keep studying!",
            Remark::NotYet => "Not passed yet. Don't give up!",
        }
    }

    /// Teacher-style note for the printed report.
    #[must_use]
    pub fn report_note(self) -> &'static str {
        match self {
            Remark::Outstanding => "Excellent. Keep up your learning achievements.",
            Remark::VeryGood => "Very good. Stay consistent in your studies.",
            Remark::Good => "Fairly good. There is still room to improve.",
            Remark::NearlyThere => "Close to the standard. Practice more questions.",
            Remark::NotYet => {
                "Below the mastery standard. Reviewing the related material is recommended."
            }
        }
    }
}
