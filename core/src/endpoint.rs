//! Endpoint table: every operation maps to one HTTP method and one path
//! relative to the API base URL.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::http::HttpMethod;

/// Campaign status filter for `GetEmails`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    InDesign,
    Tested,
    Launched,
    Ready,
    Deactivated,
}

impl EmailStatus {
    pub fn code(self) -> i64 {
        match self {
            EmailStatus::InDesign => 1,
            EmailStatus::Tested => 2,
            EmailStatus::Launched => 3,
            EmailStatus::Ready => 4,
            EmailStatus::Deactivated => -3,
        }
    }
}

/// Launch state reported in email payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    NotLaunched,
    InProgress,
    Scheduled,
    Error,
}

impl LaunchStatus {
    pub fn code(self) -> i64 {
        match self {
            LaunchStatus::NotLaunched => 0,
            LaunchStatus::InProgress => 1,
            LaunchStatus::Scheduled => 2,
            LaunchStatus::Error => -10,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LaunchStatus::NotLaunched),
            1 => Some(LaunchStatus::InProgress),
            2 => Some(LaunchStatus::Scheduled),
            -10 => Some(LaunchStatus::Error),
            _ => None,
        }
    }
}

/// Application types accepted by `CreateCustomField`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    ShortText,
    LongText,
    LargeText,
    Date,
    Url,
    Numeric,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::ShortText => "shorttext",
            FieldType::LongText => "longtext",
            FieldType::LargeText => "largetext",
            FieldType::Date => "date",
            FieldType::Url => "url",
            FieldType::Numeric => "numeric",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Types the system defines itself; they exist but cannot be created.
const SYSTEM_FIELD_TYPES: [&str; 6] = [
    "interests",
    "singlechoice",
    "multichoice",
    "birthdate",
    "gender",
    "numericchoice",
];

impl FromStr for FieldType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shorttext" => Ok(FieldType::ShortText),
            "longtext" => Ok(FieldType::LongText),
            "largetext" => Ok(FieldType::LargeText),
            "date" => Ok(FieldType::Date),
            "url" => Ok(FieldType::Url),
            "numeric" => Ok(FieldType::Numeric),
            other if SYSTEM_FIELD_TYPES.contains(&other) => Err(ClientError::SystemFieldType),
            other => Err(ClientError::FieldTypeNotCreatable {
                application_type: other.to_string(),
            }),
        }
    }
}

/// Optional filters for the email list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailFilter {
    pub status: Option<EmailStatus>,
    pub contact_list: Option<i64>,
    pub campaign_types: Vec<String>,
}

impl EmailFilter {
    fn query(&self) -> Option<String> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.code().to_string()));
        }
        if let Some(list) = self.contact_list {
            pairs.push(("contactlist", list.to_string()));
        }
        if !self.campaign_types.is_empty() {
            pairs.push(("campaign_type", self.campaign_types.join(",")));
        }
        build_query(&pairs)
    }
}

/// Optional window for an email response summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSummaryRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub launch_id: Option<String>,
}

impl ResponseSummaryRange {
    fn query(&self) -> Option<String> {
        let pairs: Vec<(&str, String)> = [
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("launch_id", &self.launch_id),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect();
        build_query(&pairs)
    }
}

fn build_query(pairs: &[(&str, String)]) -> Option<String> {
    if pairs.is_empty() {
        return None;
    }
    Some(
        pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&"),
    )
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Every operation of the API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    GetConditions,
    CreateContact,
    UpdateContact,
    UpdateContactOrCreate,
    DeleteContact,
    GetContactId { field: String, value: String },
    GetContactChanges,
    GetContactHistory,
    GetContactData,
    GetContactRegistrations,
    GetContactLists,
    CreateContactList,
    DeleteContactList { list_id: String },
    AddContactsToContactList { list_id: String },
    RemoveContactsFromContactList { list_id: String },
    GetContactsFromContactList { list_id: String },
    CheckContactInList { contact_id: i64, list_id: i64 },
    GetEmails(EmailFilter),
    CreateEmail,
    GetEmail { email_id: String },
    LaunchEmail { email_id: String },
    PreviewEmail { email_id: String },
    GetEmailResponseSummary { email_id: String, range: ResponseSummaryRange },
    SendEmailTest { email_id: String },
    GetEmailUrl { email_id: String },
    GetEmailDeliveryStatus,
    GetEmailLaunches,
    GetEmailResponses,
    UnsubscribeEmail,
    GetEmailCategories,
    GetEvents,
    TriggerEvent { event_id: String },
    GetExportStatus,
    GetFields,
    GetFieldChoices { field_id: i64 },
    CreateCustomField,
    GetFiles,
    UploadFile,
    GetSegments,
    GetFolders,
    GetForms,
    GetLanguages,
    GetSources,
    DeleteSource { source_id: String },
    CreateSource,
    AddBlacklistEntries,
    GetSettings,
}

impl Endpoint {
    pub fn method(&self) -> HttpMethod {
        use Endpoint::*;
        match self {
            CreateContact
            | DeleteContact
            | GetContactChanges
            | GetContactHistory
            | GetContactData
            | GetContactRegistrations
            | CreateContactList
            | DeleteContactList { .. }
            | AddContactsToContactList { .. }
            | RemoveContactsFromContactList { .. }
            | CreateEmail
            | LaunchEmail { .. }
            | PreviewEmail { .. }
            | SendEmailTest { .. }
            | GetEmailUrl { .. }
            | GetEmailDeliveryStatus
            | GetEmailLaunches
            | GetEmailResponses
            | UnsubscribeEmail
            | TriggerEvent { .. }
            | CreateCustomField
            | UploadFile
            | CreateSource
            | AddBlacklistEntries => HttpMethod::Post,
            UpdateContact | UpdateContactOrCreate => HttpMethod::Put,
            DeleteSource { .. } => HttpMethod::Delete,
            _ => HttpMethod::Get,
        }
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> String {
        use Endpoint::*;
        match self {
            GetConditions => "condition".to_string(),
            CreateContact | UpdateContact => "contact".to_string(),
            UpdateContactOrCreate => "contact/?create_if_not_exists=1".to_string(),
            DeleteContact => "contact/delete".to_string(),
            GetContactId { field, value } => format!("contact/{}={}", segment(field), segment(value)),
            GetContactChanges => "contact/getchanges".to_string(),
            GetContactHistory => "contact/getcontacthistory".to_string(),
            GetContactData => "contact/getdata".to_string(),
            GetContactRegistrations => "contact/getregistrations".to_string(),
            GetContactLists | CreateContactList => "contactlist".to_string(),
            DeleteContactList { list_id } => format!("contactlist/{}/deletelist", segment(list_id)),
            AddContactsToContactList { list_id } => format!("contactlist/{}/add", segment(list_id)),
            RemoveContactsFromContactList { list_id } => {
                format!("contactlist/{}/delete", segment(list_id))
            }
            GetContactsFromContactList { list_id } => {
                format!("contactlist/{}/contacts", segment(list_id))
            }
            CheckContactInList {
                contact_id,
                list_id,
            } => format!("contactlist/{list_id}/contacts/{contact_id}"),
            GetEmails(filter) => match filter.query() {
                Some(query) => format!("email/{query}"),
                None => "email".to_string(),
            },
            CreateEmail => "email".to_string(),
            GetEmail { email_id } => format!("email/{}", segment(email_id)),
            LaunchEmail { email_id } => format!("email/{}/launch", segment(email_id)),
            PreviewEmail { email_id } => format!("email/{}/preview", segment(email_id)),
            GetEmailResponseSummary { email_id, range } => {
                let path = format!("email/{}/responsesummary", segment(email_id));
                match range.query() {
                    Some(query) => format!("{path}/{query}"),
                    None => path,
                }
            }
            SendEmailTest { email_id } => format!("email/{}/sendtestmail", segment(email_id)),
            GetEmailUrl { email_id } => format!("email/{}/url", segment(email_id)),
            GetEmailDeliveryStatus => "email/getdeliverystatus".to_string(),
            GetEmailLaunches => "email/getlaunchesofemail".to_string(),
            GetEmailResponses => "email/getresponses".to_string(),
            UnsubscribeEmail => "email/unsubscribe".to_string(),
            GetEmailCategories => "emailcategory".to_string(),
            GetEvents => "event".to_string(),
            TriggerEvent { event_id } => format!("event/{}/trigger", segment(event_id)),
            GetExportStatus => "export".to_string(),
            GetFields | CreateCustomField => "field".to_string(),
            GetFieldChoices { field_id } => format!("field/{field_id}/choice"),
            GetFiles | UploadFile => "file".to_string(),
            GetSegments => "filter".to_string(),
            GetFolders => "folder".to_string(),
            GetForms => "form".to_string(),
            GetLanguages => "language".to_string(),
            GetSources => "source".to_string(),
            DeleteSource { source_id } => format!("source/{}/delete", segment(source_id)),
            CreateSource => "source/create".to_string(),
            AddBlacklistEntries => "blacklist".to_string(),
            GetSettings => "settings".to_string(),
        }
    }
}
