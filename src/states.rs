// src/states.rs

use serde::{Deserialize, Serialize};

/// Canonical attributes of a state as returned by a `StateResolver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInfo {
    pub name: String,
    pub abbr: String,
    pub fips: String,
}

impl StateInfo {
    /// Folder the Census bulk download unpacks to, e.g. `NewYork_Tracts_Block_Groups_Only`.
    pub fn folder_name(&self) -> String {
        format!("{}_Tracts_Block_Groups_Only", self.name.replace(' ', ""))
    }
}

/// Maps a state name, postal abbreviation or FIPS code to its canonical attributes.
pub trait StateResolver {
    fn resolve(&self, name_or_fips: &str) -> Option<StateInfo>;
}

/// (name, abbreviation, FIPS)
const STATES: &[(&str, &str, &str)] = &[
    ("Alabama", "AL", "01"),
    ("Alaska", "AK", "02"),
    ("Arizona", "AZ", "04"),
    ("Arkansas", "AR", "05"),
    ("California", "CA", "06"),
    ("Colorado", "CO", "08"),
    ("Connecticut", "CT", "09"),
    ("Delaware", "DE", "10"),
    ("District of Columbia", "DC", "11"),
    ("Florida", "FL", "12"),
    ("Georgia", "GA", "13"),
    ("Hawaii", "HI", "15"),
    ("Idaho", "ID", "16"),
    ("Illinois", "IL", "17"),
    ("Indiana", "IN", "18"),
    ("Iowa", "IA", "19"),
    ("Kansas", "KS", "20"),
    ("Kentucky", "KY", "21"),
    ("Louisiana", "LA", "22"),
    ("Maine", "ME", "23"),
    ("Maryland", "MD", "24"),
    ("Massachusetts", "MA", "25"),
    ("Michigan", "MI", "26"),
    ("Minnesota", "MN", "27"),
    ("Mississippi", "MS", "28"),
    ("Missouri", "MO", "29"),
    ("Montana", "MT", "30"),
    ("Nebraska", "NE", "31"),
    ("Nevada", "NV", "32"),
    ("New Hampshire", "NH", "33"),
    ("New Jersey", "NJ", "34"),
    ("New Mexico", "NM", "35"),
    ("New York", "NY", "36"),
    ("North Carolina", "NC", "37"),
    ("North Dakota", "ND", "38"),
    ("Ohio", "OH", "39"),
    ("Oklahoma", "OK", "40"),
    ("Oregon", "OR", "41"),
    ("Pennsylvania", "PA", "42"),
    ("Rhode Island", "RI", "44"),
    ("South Carolina", "SC", "45"),
    ("South Dakota", "SD", "46"),
    ("Tennessee", "TN", "47"),
    ("Texas", "TX", "48"),
    ("Utah", "UT", "49"),
    ("Vermont", "VT", "50"),
    ("Virginia", "VA", "51"),
    ("Washington", "WA", "53"),
    ("West Virginia", "WV", "54"),
    ("Wisconsin", "WI", "55"),
    ("Wyoming", "WY", "56"),
    ("Puerto Rico", "PR", "72"),
];

/// Built-in table of the 50 states, DC and Puerto Rico.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsStates;

impl StateResolver for UsStates {
    /// Numeric input is matched as a FIPS code (`"6"` and `"06"` both work),
    /// two letters as a postal abbreviation, anything else as a name ignoring
    /// case and whitespace.
    fn resolve(&self, name_or_fips: &str) -> Option<StateInfo> {
        let key = name_or_fips.trim();
        if key.is_empty() {
            return None;
        }

        let hit = if key.chars().all(|c| c.is_ascii_digit()) {
            let fips = format!("{:0>2}", key);
            STATES.iter().find(|(_, _, f)| *f == fips)
        } else if key.len() == 2 {
            STATES
                .iter()
                .find(|(_, abbr, _)| abbr.eq_ignore_ascii_case(key))
        } else {
            let squashed = squash(key);
            STATES.iter().find(|(name, _, _)| squash(name) == squashed)
        };

        hit.map(|(name, abbr, fips)| StateInfo {
            name: name.to_string(),
            abbr: abbr.to_string(),
            fips: fips.to_string(),
        })
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
