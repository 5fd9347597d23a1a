use serde::{Deserialize, Serialize};
use sgp4::{Constants, Elements};

use crate::error::{Error, Result};

/// Validated two-line element set. Each line carries a trailing checksum
/// digit: sum of digits with `-` counting as 1, mod 10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(String, String)", into = "(String, String)")]
pub struct Tle {
    line1: String,
    line2: String,
}

impl Tle {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Result<Self> {
        let line1 = line1.into();
        let line2 = line2.into();
        verify_checksum(&line1)?;
        verify_checksum(&line2)?;
        Ok(Tle { line1, line2 })
    }

    /// Parse TLE text: two element lines, optionally preceded by a name line.
    pub fn parse(text: &str) -> Result<(Option<String>, Tle)> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim_end())
            .filter(|l| !l.trim().is_empty())
            .collect();

        match lines.len() {
            2 => Ok((None, Tle::new(lines[0], lines[1])?)),
            3 => Ok((
                Some(lines[0].trim().to_string()),
                Tle::new(lines[1], lines[2])?,
            )),
            n => Err(Error::validation(
                "tle",
                format!("must have two element lines, got {n} lines"),
            )),
        }
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// Catalog number field of line 1 (columns 3-7).
    pub fn catalog_number(&self) -> &str {
        self.line1.get(2..7).unwrap_or("").trim()
    }
}

impl TryFrom<(String, String)> for Tle {
    type Error = Error;

    fn try_from(lines: (String, String)) -> Result<Self> {
        Tle::new(lines.0, lines.1)
    }
}

impl From<Tle> for (String, String) {
    fn from(tle: Tle) -> (String, String) {
        (tle.line1, tle.line2)
    }
}

fn verify_checksum(line: &str) -> Result<()> {
    let Some(last) = line.chars().last() else {
        return Err(Error::validation("tle", "element line is empty"));
    };
    // slice on a char boundary so non-ASCII garbage fails validation
    // instead of panicking
    let body = &line[..line.len() - last.len_utf8()];
    let sum: u32 = body
        .chars()
        .map(|c| match c {
            '-' => 1,
            c => c.to_digit(10).unwrap_or(0),
        })
        .sum();
    let checksum = sum % 10;
    if last.to_digit(10) != Some(checksum) {
        return Err(Error::validation(
            "tle",
            format!("checksum invalid: {checksum} != {last}"),
        ));
    }
    Ok(())
}

/// Immutable-per-version orbital element set plus identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satellite {
    pub hwid: String,
    #[serde(default)]
    pub catalog_id: String,
    pub tle: Tle,
}

impl Satellite {
    pub fn new(hwid: impl Into<String>, tle: Tle) -> Self {
        let catalog_id = tle.catalog_number().to_string();
        Satellite {
            hwid: hwid.into(),
            catalog_id,
            tle,
        }
    }

    /// Parse the element set for propagation.
    pub fn elements(&self) -> Result<(Elements, Constants)> {
        let elements = Elements::from_tle(
            Some(self.hwid.clone()),
            self.tle.line1().as_bytes(),
            self.tle.line2().as_bytes(),
        )
        .map_err(|e| Error::Propagation(e.to_string()))?;
        let constants =
            Constants::from_elements(&elements).map_err(|e| Error::Propagation(e.to_string()))?;
        Ok((elements, constants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn accepts_valid_checksums() {
        assert!(Tle::new(LINE1, LINE2).is_ok());
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut bad = LINE1.to_string();
        bad.pop();
        bad.push('3');
        assert!(Tle::new(bad, LINE2).is_err());
    }

    #[test]
    fn rejects_corrupted_body() {
        // flipping a digit in the body invalidates the trailing checksum
        let bad = LINE2.replace("51.6416", "51.6417");
        assert!(Tle::new(LINE1, bad).is_err());
    }

    #[test]
    fn rejects_non_ascii_lines_without_panicking() {
        assert!(Tle::new("1 25544U 98067A é", LINE2).is_err());
        let trailing = format!("{}é", &LINE1[..LINE1.len() - 1]);
        assert!(Tle::new(trailing, LINE2).is_err());
    }

    #[test]
    fn minus_signs_count_as_one() {
        // LINE1 contains three '-' characters; its checksum only verifies
        // if each contributes 1.
        let stripped: u32 = LINE1[..LINE1.len() - 1]
            .chars()
            .filter_map(|c| c.to_digit(10))
            .sum();
        assert_ne!(stripped % 10, 7, "fixture must exercise the '-' rule");
        assert!(Tle::new(LINE1, LINE2).is_ok());
    }

    #[test]
    fn parses_named_and_unnamed_tles() {
        let named = format!("ISS (ZARYA)\n{LINE1}\n{LINE2}\n");
        let (name, _) = Tle::parse(&named).unwrap();
        assert_eq!(name.as_deref(), Some("ISS (ZARYA)"));

        let bare = format!("{LINE1}\n{LINE2}");
        let (name, tle) = Tle::parse(&bare).unwrap();
        assert!(name.is_none());
        assert_eq!(tle.catalog_number(), "25544");
    }

    #[test]
    fn rejects_wrong_line_count() {
        assert!(Tle::parse(LINE1).is_err());
    }

    #[test]
    fn satellite_parses_elements() {
        let sat = Satellite::new("iss", Tle::new(LINE1, LINE2).unwrap());
        assert_eq!(sat.catalog_id, "25544");
        let (elements, _) = sat.elements().unwrap();
        assert_eq!(elements.norad_id, 25544);
    }
}
