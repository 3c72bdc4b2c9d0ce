//! Typed helpers, one per endpoint.
//!
//! Most helpers forward their body untouched. The exceptions are the contact
//! writes (field names are resolved to ids first), `get_contact_id` (turns a
//! missing id into an error) and the helpers that assemble their own body.

use serde_json::{json, Value};

use crate::client::{Body, EmarsysClient};
use crate::endpoint::{EmailFilter, Endpoint, FieldType, ResponseSummaryRange};
use crate::envelope::ResponseEnvelope;
use crate::error::ClientError;
use crate::http::HttpTransport;
use crate::mapping::{json_id, FieldKey, FieldRef};

impl<T: HttpTransport> EmarsysClient<T> {
    pub fn get_conditions(&self) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetConditions, &Body::new())
    }

    pub fn create_contact(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        let body = self.mapping().map_contact_body(data)?;
        self.call(&Endpoint::CreateContact, &body)
    }

    pub fn update_contact(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        let body = self.mapping().map_contact_body(data)?;
        self.call(&Endpoint::UpdateContact, &body)
    }

    pub fn update_contact_or_create(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        let body = self.mapping().map_contact_body(data)?;
        self.call(&Endpoint::UpdateContactOrCreate, &body)
    }

    pub fn delete_contact(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::DeleteContact, data)
    }

    /// Internal id of the contact whose `field` equals `value`.
    ///
    /// `field` may be a symbolic name, a system field or a numeric id. A
    /// reply without `data.id` becomes `ClientError::Reply` carrying the
    /// envelope's code and text.
    pub fn get_contact_id(&self, field: &str, value: &str) -> crate::Result<i64> {
        let field = match FieldRef::parse(field) {
            FieldRef::Numeric(id) => id.to_string(),
            FieldRef::Symbolic(name) => self.field_id(&name)?.to_string(),
        };
        let envelope = self.call(
            &Endpoint::GetContactId {
                field,
                value: value.to_string(),
            },
            &Body::new(),
        )?;

        match envelope.data().get("id").and_then(json_id) {
            Some(id) => Ok(id),
            None => Err(ClientError::Reply {
                code: envelope.reply_code(),
                text: envelope.reply_text().to_string(),
            }
            .into()),
        }
    }

    pub fn get_contact_changes(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetContactChanges, data)
    }

    pub fn get_contact_history(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetContactHistory, data)
    }

    pub fn get_contact_data(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetContactData, data)
    }

    pub fn get_contact_registrations(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetContactRegistrations, data)
    }

    pub fn get_contact_lists(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetContactLists, data)
    }

    pub fn create_contact_list(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::CreateContactList, data)
    }

    pub fn delete_contact_list(&self, list_id: &str) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::DeleteContactList {
            list_id: list_id.to_string(),
        };
        self.call(&endpoint, &Body::new())
    }

    pub fn add_contacts_to_contact_list(
        &self,
        list_id: &str,
        data: &Body,
    ) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::AddContactsToContactList {
            list_id: list_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn remove_contacts_from_contact_list(
        &self,
        list_id: &str,
        data: &Body,
    ) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::RemoveContactsFromContactList {
            list_id: list_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn get_contacts_from_contact_list(
        &self,
        list_id: &str,
        data: &Body,
    ) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::GetContactsFromContactList {
            list_id: list_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn check_contact_in_list(
        &self,
        contact_id: i64,
        list_id: i64,
    ) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::CheckContactInList {
            contact_id,
            list_id,
        };
        self.call(&endpoint, &Body::new())
    }

    pub fn get_emails(&self, filter: EmailFilter) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetEmails(filter), &Body::new())
    }

    pub fn create_email(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::CreateEmail, data)
    }

    pub fn get_email(&self, email_id: &str, data: &Body) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::GetEmail {
            email_id: email_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn launch_email(&self, email_id: &str, data: &Body) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::LaunchEmail {
            email_id: email_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn preview_email(&self, email_id: &str, data: &Body) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::PreviewEmail {
            email_id: email_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn get_email_response_summary(
        &self,
        email_id: &str,
        range: ResponseSummaryRange,
    ) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::GetEmailResponseSummary {
            email_id: email_id.to_string(),
            range,
        };
        self.call(&endpoint, &Body::new())
    }

    pub fn send_email_test(&self, email_id: &str, data: &Body) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::SendEmailTest {
            email_id: email_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn get_email_url(&self, email_id: &str, data: &Body) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::GetEmailUrl {
            email_id: email_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn get_email_delivery_status(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetEmailDeliveryStatus, data)
    }

    pub fn get_email_launches(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetEmailLaunches, data)
    }

    pub fn get_email_responses(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetEmailResponses, data)
    }

    pub fn unsubscribe_email(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::UnsubscribeEmail, data)
    }

    pub fn get_email_categories(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetEmailCategories, data)
    }

    pub fn get_events(&self) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetEvents, &Body::new())
    }

    pub fn trigger_event(&self, event_id: &str, data: &Body) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::TriggerEvent {
            event_id: event_id.to_string(),
        };
        self.call(&endpoint, data)
    }

    pub fn get_export_status(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetExportStatus, data)
    }

    pub fn get_fields(&self) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetFields, &Body::new())
    }

    /// Choices of one field, given by id or by symbolic name.
    pub fn get_field_choices(&self, field: &str) -> crate::Result<ResponseEnvelope> {
        let field_id = match FieldRef::parse(field) {
            FieldRef::Numeric(id) => id,
            FieldRef::Symbolic(name) => match self.field_id(&name)? {
                FieldKey::Id(id) => id,
                FieldKey::System(name) => return Err(ClientError::FieldNotFound { field: name }.into()),
            },
        };
        self.call(&Endpoint::GetFieldChoices { field_id }, &Body::new())
    }

    pub fn create_custom_field(
        &self,
        name: &str,
        application_type: FieldType,
    ) -> crate::Result<ResponseEnvelope> {
        let body = object(json!({
            "name": name,
            "application_type": application_type.as_str(),
        }));
        self.call(&Endpoint::CreateCustomField, &body)
    }

    pub fn get_files(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetFiles, data)
    }

    pub fn upload_file(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::UploadFile, data)
    }

    pub fn get_segments(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetSegments, data)
    }

    pub fn get_folders(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetFolders, data)
    }

    pub fn get_forms(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetForms, data)
    }

    pub fn get_languages(&self) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetLanguages, &Body::new())
    }

    pub fn get_sources(&self) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetSources, &Body::new())
    }

    pub fn delete_source(&self, source_id: &str) -> crate::Result<ResponseEnvelope> {
        let endpoint = Endpoint::DeleteSource {
            source_id: source_id.to_string(),
        };
        self.call(&endpoint, &Body::new())
    }

    pub fn create_source(&self, data: &Body) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::CreateSource, data)
    }

    pub fn add_blacklist_entries(
        &self,
        emails: &[&str],
        domains: &[&str],
    ) -> crate::Result<ResponseEnvelope> {
        let body = object(json!({
            "emails": emails,
            "domains": domains,
        }));
        self.call(&Endpoint::AddBlacklistEntries, &body)
    }

    pub fn get_settings(&self) -> crate::Result<ResponseEnvelope> {
        self.call(&Endpoint::GetSettings, &Body::new())
    }
}

fn object(value: Value) -> Body {
    match value {
        Value::Object(map) => map,
        _ => Body::new(),
    }
}
