/// National identity number decoding and validation
///
/// The 14-digit number encodes, by fixed digit positions:
/// - digit 0: century (2 = 1900s, 3 = 2000s)
/// - digits 1-6: birth date as YYMMDD within that century
/// - digits 7-8: governorate code
/// - digit 12: gender (even = female, odd = male)
///
/// Decoding is pure: no I/O, no hidden state. The holder's age must lie in
/// [18, 100] inclusive for the number to be accepted.
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted holder age, inclusive
const MIN_AGE: i32 = 18;
/// Maximum accepted holder age, inclusive
const MAX_AGE: i32 = 100;

/// Structurally invalid national identity number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid national id format")]
pub struct InvalidNationalId;

/// Gender encoded in the identity number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Fields decoded from a valid national identity number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedNationalId {
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub governorate_code: u8,
    pub governorate: &'static str,
}

/// Decode a national identity number against the current date
pub fn decode(raw: &str) -> Result<DecodedNationalId, InvalidNationalId> {
    decode_at(raw, Utc::now().date_naive())
}

/// Decode a national identity number, computing age relative to `today`
pub fn decode_at(raw: &str, today: NaiveDate) -> Result<DecodedNationalId, InvalidNationalId> {
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidNationalId);
    }

    let digits: Vec<u32> = raw.bytes().map(|b| (b - b'0') as u32).collect();

    let century_base = match digits[0] {
        2 => 1900,
        3 => 2000,
        _ => return Err(InvalidNationalId),
    };

    let year = century_base + (digits[1] * 10 + digits[2]) as i32;
    let month = digits[3] * 10 + digits[4];
    let day = digits[5] * 10 + digits[6];

    // Rejects out-of-range months and non-existent dates such as Feb 30
    let birth_date =
        NaiveDate::from_ymd_opt(year, month, day).ok_or(InvalidNationalId)?;

    let age = age_at(birth_date, today);
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(InvalidNationalId);
    }

    let governorate_code = (digits[7] * 10 + digits[8]) as u8;
    let gender = if digits[12] % 2 == 0 {
        Gender::Female
    } else {
        Gender::Male
    };

    Ok(DecodedNationalId {
        birth_date,
        gender,
        governorate_code,
        governorate: governorate_name(governorate_code),
    })
}

/// Whole years between birth date and `today`, decrementing when the
/// birthday has not yet occurred this year (day-of-year comparison)
fn age_at(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if today.ordinal() < birth_date.ordinal() {
        age -= 1;
    }
    age
}

/// Governorate lookup; unknown codes map to "Unspecified" without
/// invalidating the number
pub fn governorate_name(code: u8) -> &'static str {
    match code {
        1 => "Cairo",
        2 => "Alexandria",
        3 => "Port Said",
        4 => "Suez",
        11 => "Damietta",
        12 => "Dakahlia",
        13 => "Sharqia",
        14 => "Qalyubia",
        15 => "Kafr El Sheikh",
        16 => "Gharbia",
        17 => "Monufia",
        18 => "Beheira",
        19 => "Ismailia",
        21 => "Giza",
        22 => "Beni Suef",
        23 => "Fayoum",
        24 => "Minya",
        25 => "Assiut",
        26 => "Sohag",
        27 => "Qena",
        28 => "Aswan",
        29 => "Luxor",
        31 => "Red Sea",
        32 => "New Valley",
        33 => "Matrouh",
        34 => "North Sinai",
        35 => "South Sinai",
        _ => "Unspecified",
    }
}
