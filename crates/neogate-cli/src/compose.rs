//! Composing objects from upload requests
//!
//! [`ObjectComposer`] collects the attributes of the object being uploaded.
//! Headers are folded in first; [`ObjectComposer::finalize`] then fills in
//! what the client left out (expiration epoch, timestamp, file name).

use crate::ApiError;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use neogate_core::attribute::{
    ATTRIBUTE_EXPIRATION_EPOCH, ATTRIBUTE_FILE_NAME, ATTRIBUTE_TIMESTAMP, attribute_key_from_header,
    strip_user_attribute_prefix,
};
use neogate_core::expiration::expiration_epoch;
use neogate_core::{Attribute, AttributeKind, ContainerId, ExpirationForm, ExpirationResolver, OwnerId};
use neogate_network::{CallAuth, NeoFs, ObjectDraft};
use tracing::{debug, warn};

/// Per-request object builder
#[derive(Debug)]
pub struct ObjectComposer {
    container: ContainerId,
    owner: OwnerId,
    attributes: Vec<Attribute>,
    filename_set: bool,
    timestamp_set: bool,
    expiration: ExpirationResolver,
}

impl ObjectComposer {
    pub fn new(container: ContainerId, owner: OwnerId) -> Self {
        Self {
            container,
            owner,
            attributes: Vec::new(),
            filename_set: false,
            timestamp_set: false,
            expiration: ExpirationResolver::new(),
        }
    }

    /// Attributes collected so far, in header order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Fold every `X-Attribute-*` header into the object.
    ///
    /// Expiration headers are not stored; they only feed the epoch computed
    /// in [`finalize`](Self::finalize). Headers with empty values are skipped.
    pub fn process_headers(&mut self, headers: &HeaderMap, now: DateTime<Utc>) -> Result<(), ApiError> {
        for (name, value) in headers {
            let Some(suffix) = strip_user_attribute_prefix(name.as_str()) else {
                continue;
            };
            let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
                warn!(header = %name, "Skipping attribute header with non UTF-8 value");
                continue;
            };
            if value.is_empty() {
                continue;
            }

            if let Some(form) = ExpirationForm::from_header_suffix(suffix) {
                let evaluated = self.expiration.offer(form, value, now).map_err(|e| {
                    warn!(header = %name, value, error = %e, "Incorrect expiration header");
                    e
                })?;
                debug!(header = %name, evaluated, "Expiration header");
                continue;
            }

            self.write_header_attribute(suffix, value);
        }
        Ok(())
    }

    fn write_header_attribute(&mut self, suffix: &str, value: &str) {
        let key = attribute_key_from_header(suffix);
        match AttributeKind::of(&key) {
            AttributeKind::ExpirationEpoch => self.expiration.mark_epoch_written(),
            AttributeKind::FileName => self.filename_set = true,
            AttributeKind::Timestamp => self.timestamp_set = true,
            AttributeKind::ContentType | AttributeKind::Opaque => {}
        }
        self.attributes.push(Attribute::new(key, value));
    }

    /// Attach defaults for whatever the headers did not provide.
    ///
    /// A pending expiration duration is converted into an epoch using a
    /// fresh network info snapshot.
    pub async fn finalize(
        &mut self,
        network: &dyn NeoFs,
        auth: &CallAuth,
        filename: &str,
        default_timestamp: bool,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if let Some(until) = self.expiration.pending() {
            let info = network.network_info(auth).await.map_err(|e| {
                warn!(error = %e, "Could not get network info");
                ApiError::upstream(e)
            })?;
            let epoch = expiration_epoch(&info, until)?;
            debug!(
                current_epoch = info.current_epoch,
                expiration_epoch = epoch,
                "Expiration resolved"
            );
            self.attributes
                .push(Attribute::new(ATTRIBUTE_EXPIRATION_EPOCH, epoch.to_string()));
        }

        if !self.timestamp_set && default_timestamp {
            self.attributes
                .push(Attribute::new(ATTRIBUTE_TIMESTAMP, now.timestamp().to_string()));
        }

        if !self.filename_set {
            self.attributes.push(Attribute::new(ATTRIBUTE_FILE_NAME, filename));
        }

        Ok(())
    }

    pub fn into_draft(self) -> ObjectDraft {
        ObjectDraft {
            container: self.container,
            owner: self.owner,
            attributes: self.attributes,
        }
    }
}
