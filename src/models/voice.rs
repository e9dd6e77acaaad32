use std::fmt;

/// Voices accepted by the upstream generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Fable,
    Nova,
    Onyx,
    Sage,
    Shimmer,
    Verse,
}

impl Voice {
    pub const ALL: [Voice; 11] = [
        Voice::Alloy,
        Voice::Ash,
        Voice::Ballad,
        Voice::Coral,
        Voice::Echo,
        Voice::Fable,
        Voice::Nova,
        Voice::Onyx,
        Voice::Sage,
        Voice::Shimmer,
        Voice::Verse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Ash => "ash",
            Voice::Ballad => "ballad",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Nova => "nova",
            Voice::Onyx => "onyx",
            Voice::Sage => "sage",
            Voice::Shimmer => "shimmer",
            Voice::Verse => "verse",
        }
    }

    pub fn parse(s: &str) -> Option<Voice> {
        Voice::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    /// Comma-separated list of valid voice names, for error messages.
    pub fn valid_names() -> String {
        Voice::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Voice {
    fn default() -> Self {
        Voice::Alloy
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
