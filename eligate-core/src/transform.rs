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

//! Pure mappings from a [`PersonRecord`] to the two partner request bodies.
//!
//! The request id is passed in by the caller, so both builders are
//! deterministic and byte-for-byte repeatable. [`generate_request_id`] is the
//! production id source (wall-clock milliseconds as a decimal string).

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::person::PersonRecord;

const MCID_MIN_SCORE: &str = "100";
const MCID_MAX_RESULT: &str = "1";
const PRIMARY_ADDRESS_TYPE: &str = "P";
const MEDICAL_COUNTRY: &str = "US";

/// Millisecond wall-clock timestamp, the partner APIs' request-id convention.
pub fn generate_request_id() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
        .to_string()
}

/// Consumer-search body for the member identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McidSearchRequest {
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub process_status: ProcessStatus,
    pub consumer: Vec<Consumer>,
    pub search_setting: SearchSetting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatus {
    pub completed: String,
    pub is_memput: String,
    pub error_code: Option<String>,
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub sex: String,
    /// `YYYYMMDD` — dashes stripped from the inbound date of birth.
    pub dob: String,
    pub address_list: Vec<Address>,
    pub id: ConsumerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "type")]
    pub kind: String,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerId {
    pub ssn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSetting {
    pub min_score: String,
    pub max_result: String,
}

/// Flat submit body for the medical eligibility endpoint.
///
/// Contact fields the gateway never learns are padded with empty strings; the
/// endpoint rejects bodies that omit them outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalEligibilityRequest {
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    pub date_of_birth: String,
    pub gender: String,
    pub zip_codes: Vec<String>,
    pub caller_id: String,
    pub middle_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone_number: String,
    pub email: String,
}

/// Output of the `debug_transforms` tool: the normalized input next to the
/// exact bodies the two partner calls would send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDebug {
    pub success: bool,
    pub original_input: PersonRecord,
    pub mcid_transformed: McidSearchRequest,
    pub medical_transformed: MedicalEligibilityRequest,
}

impl TransformDebug {
    pub fn new(
        original_input: PersonRecord,
        mcid_transformed: McidSearchRequest,
        medical_transformed: MedicalEligibilityRequest,
    ) -> Self {
        TransformDebug {
            success: true,
            original_input,
            mcid_transformed,
            medical_transformed,
        }
    }
}

/// Builds the nested consumer-search body.
///
/// The date of birth collapses to `YYYYMMDD`, and only the first zip code is
/// carried (the rest are dropped — the search endpoint takes one address).
/// Malformed dates are not rejected; they produce malformed strings.
pub fn to_mcid_search_request(person: &PersonRecord, request_id: &str) -> McidSearchRequest {
    McidSearchRequest {
        request_id: request_id.to_string(),
        process_status: ProcessStatus {
            completed: "false".to_string(),
            is_memput: "false".to_string(),
            error_code: None,
            error_text: None,
        },
        consumer: vec![Consumer {
            first_name: person.first_name.clone(),
            last_name: person.last_name.clone(),
            middle_name: None,
            sex: person.gender.clone(),
            dob: person.date_of_birth.replace('-', ""),
            address_list: vec![Address {
                kind: PRIMARY_ADDRESS_TYPE.to_string(),
                zip: person.zip_codes.first().cloned(),
            }],
            id: ConsumerId {
                ssn: person.ssn.clone(),
            },
        }],
        search_setting: SearchSetting {
            min_score: MCID_MIN_SCORE.to_string(),
            max_result: MCID_MAX_RESULT.to_string(),
        },
    }
}

/// Builds the flat eligibility submit body.
pub fn to_medical_eligibility_request(
    person: &PersonRecord,
    request_id: &str,
    caller_id: &str,
) -> MedicalEligibilityRequest {
    MedicalEligibilityRequest {
        request_id: request_id.to_string(),
        first_name: person.first_name.clone(),
        last_name: person.last_name.clone(),
        ssn: person.ssn.clone(),
        date_of_birth: person.date_of_birth.clone(),
        gender: person.gender.clone(),
        zip_codes: person.zip_codes.clone(),
        caller_id: caller_id.to_string(),
        middle_name: String::new(),
        address_line1: String::new(),
        address_line2: String::new(),
        city: String::new(),
        state: String::new(),
        country: MEDICAL_COUNTRY.to_string(),
        phone_number: String::new(),
        email: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> PersonRecord {
        PersonRecord {
            first_name: "JANE".to_string(),
            last_name: "DOE".to_string(),
            ssn: "123456789".to_string(),
            date_of_birth: "1985-10-10".to_string(),
            gender: "f".to_string(),
            zip_codes: Vec::new(),
        }
        .normalize()
    }

    #[test]
    fn mcid_request_has_one_consumer_with_dashless_dob() {
        let request = to_mcid_search_request(&jane(), "1700000000000");
        assert_eq!(request.consumer.len(), 1);
        assert_eq!(request.consumer[0].dob, "19851010");
        assert!(!request.consumer[0].dob.contains('-'));
    }

    #[test]
    fn normalized_jane_flows_through_end_to_end() {
        let person = jane();
        assert_eq!(person.gender, "F");
        assert_eq!(person.zip_codes, vec!["00000".to_string()]);

        let request = to_mcid_search_request(&person, "1700000000000");
        assert_eq!(request.consumer[0].sex, "F");
        assert_eq!(request.consumer[0].dob, "19851010");
        assert_eq!(
            request.consumer[0].address_list[0].zip.as_deref(),
            Some("00000")
        );
    }

    #[test]
    fn only_the_first_zip_code_is_carried() {
        let mut person = jane();
        person.zip_codes = vec!["98004".to_string(), "10001".to_string()];
        let request = to_mcid_search_request(&person, "1");
        assert_eq!(request.consumer[0].address_list.len(), 1);
        assert_eq!(
            request.consumer[0].address_list[0].zip.as_deref(),
            Some("98004")
        );
    }

    #[test]
    fn transforms_are_pure_given_a_fixed_request_id() {
        let person = jane();
        assert_eq!(
            to_mcid_search_request(&person, "42"),
            to_mcid_search_request(&person, "42")
        );
        assert_eq!(
            to_medical_eligibility_request(&person, "42", "caller"),
            to_medical_eligibility_request(&person, "42", "caller")
        );
    }

    #[test]
    fn mcid_wire_shape_matches_the_partner_contract() {
        let value = serde_json::to_value(to_mcid_search_request(&jane(), "99")).unwrap();
        assert_eq!(value["requestID"], "99");
        assert_eq!(value["processStatus"]["completed"], "false");
        assert_eq!(value["processStatus"]["isMemput"], "false");
        assert!(value["processStatus"]["errorCode"].is_null());
        assert!(value["processStatus"]["errorText"].is_null());
        assert!(value["consumer"][0]["middleName"].is_null());
        assert_eq!(value["consumer"][0]["addressList"][0]["type"], "P");
        assert_eq!(value["searchSetting"]["minScore"], "100");
        assert_eq!(value["searchSetting"]["maxResult"], "1");
    }

    #[test]
    fn medical_request_keeps_dashes_and_all_zips() {
        let mut person = jane();
        person.zip_codes = vec!["98004".to_string(), "10001".to_string()];
        let request = to_medical_eligibility_request(&person, "7", "test-caller");
        assert_eq!(request.date_of_birth, "1985-10-10");
        assert_eq!(request.zip_codes.len(), 2);
        assert_eq!(request.caller_id, "test-caller");
    }

    #[test]
    fn medical_wire_shape_pads_contact_fields() {
        let value =
            serde_json::to_value(to_medical_eligibility_request(&jane(), "7", "test-caller"))
                .unwrap();
        assert_eq!(value["requestID"], "7");
        assert_eq!(value["callerId"], "test-caller");
        assert_eq!(value["country"], "US");
        for field in [
            "middleName",
            "addressLine1",
            "addressLine2",
            "city",
            "state",
            "phoneNumber",
            "email",
        ] {
            assert_eq!(value[field], "", "expected empty string for {field}");
        }
    }

    #[test]
    fn request_ids_are_decimal_millis() {
        let id = generate_request_id();
        assert!(id.len() >= 13, "unexpectedly short id: {id}");
        assert!(id.bytes().all(|b| b.is_ascii_digit()));
    }
}
