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

//! Shared domain types for the eligate gateway.
//!
//! Everything in this crate is pure data and pure functions: the inbound
//! person record and its normalization rules, the two partner request shapes
//! derived from it, the authorization schemes the eligibility endpoint is
//! called with, and the response envelopes the gateway hands back to its
//! callers. All I/O lives in `eligate-server`.

pub mod auth;
pub mod envelope;
pub mod person;
pub mod transform;

pub use auth::{AccessToken, AuthScheme};
pub use envelope::{
    CallEnvelope, CombinedReport, ConnectionReport, EndpointStatus, ProbeAttempt, ProbeReport,
    ResponseBody, UpstreamError, UpstreamResponse,
};
pub use person::PersonRecord;
pub use transform::{
    generate_request_id, to_mcid_search_request, to_medical_eligibility_request, McidSearchRequest,
    MedicalEligibilityRequest, TransformDebug,
};
