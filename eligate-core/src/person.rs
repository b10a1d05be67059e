// Copyright 2025 Eligate Contributors (https://github.com/eligate)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};

/// Zip used when a record arrives without any.
const DEFAULT_ZIP: &str = "00000";

/// Canonical inbound person record.
///
/// Wire field names are camelCase (`firstName`, `dateOfBirth`, `zipCodes`).
/// Values are forwarded to the partner endpoints as-is; the only shaping
/// applied on the way in is [`PersonRecord::normalize`]. Malformed content
/// (non-digit SSNs, bad dates) is not rejected here — the partner services
/// answer for themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub gender: String,
    #[serde(default)]
    pub zip_codes: Vec<String>,
}

impl PersonRecord {
    /// Applies the inbound shaping rules:
    ///
    /// - every string field is whitespace-trimmed,
    /// - `gender` is uppercased when it spells `m`/`f` (anything else passes
    ///   through untouched),
    /// - empty `zip_codes` becomes `["00000"]`.
    ///
    /// After this call `zip_codes` is never empty.
    pub fn normalize(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.ssn = self.ssn.trim().to_string();
        self.date_of_birth = self.date_of_birth.trim().to_string();

        let gender = self.gender.trim();
        self.gender = if gender.eq_ignore_ascii_case("m") || gender.eq_ignore_ascii_case("f") {
            gender.to_ascii_uppercase()
        } else {
            gender.to_string()
        };

        self.zip_codes = self
            .zip_codes
            .iter()
            .map(|zip| zip.trim().to_string())
            .collect();
        if self.zip_codes.is_empty() {
            self.zip_codes = vec![DEFAULT_ZIP.to_string()];
        }
        self
    }

    /// Built-in record used by the `all` tool when no body is supplied.
    pub fn sample() -> Self {
        PersonRecord {
            first_name: "JANE".to_string(),
            last_name: "DOE".to_string(),
            ssn: "123456789".to_string(),
            date_of_birth: "1985-10-10".to_string(),
            gender: "F".to_string(),
            zip_codes: Vec::new(),
        }
    }
}
