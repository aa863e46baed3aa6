use std::fmt;
use std::str::FromStr;

/// Calendar month in `YYYY-MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: u16,
    month: u8,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Month format should be YYYY-MM")]
pub struct MonthFormatError;

impl Month {
    pub fn new(year: u16, month: u8) -> Result<Self, MonthFormatError> {
        if !(1..=12).contains(&month) {
            return Err(MonthFormatError);
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl FromStr for Month {
    type Err = MonthFormatError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let bytes = raw.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(MonthFormatError);
        }
        let (year, month) = (&raw[..4], &raw[5..]);
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(MonthFormatError);
        }
        let year: u16 = year.parse().map_err(|_| MonthFormatError)?;
        let month: u8 = month.parse().map_err(|_| MonthFormatError)?;
        Month::new(year, month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
