//! Configuration resolution against instance data
//!
//! Settings may be literal or bound to a field in the instance's form data.
//! [`ConfigResolver`] turns them into concrete values for one instance and
//! derives the correspondence parties and submitter classification that go
//! into the archive record.

pub mod formdata;

use crate::adapters::platform::{InstanceClient, OrgRegistry, PartyRegistry};
use crate::config::{ArchivelinkConfig, BindableValue, DataBinding};
use crate::core::payload::record::{Classification, CorrespondenceParty};
use crate::domain::{ArchiveError, Instance, Principal, Recipient, Result};
use formdata::FormData;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One instance with the data element contents read so far
///
/// Lives for a single request, so recipient resolution, metadata and the
/// document payloads each see one read per element.
pub struct InstanceData<'a> {
    instance: &'a Instance,
    fetched: Mutex<HashMap<Uuid, Vec<u8>>>,
}

impl<'a> InstanceData<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            fetched: Mutex::new(HashMap::new()),
        }
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    /// Contents of `element_id`, fetched on first use
    pub async fn bytes(&self, instances: &dyn InstanceClient, element_id: Uuid) -> Result<Vec<u8>> {
        if let Some(bytes) = self.fetched.lock().await.get(&element_id) {
            return Ok(bytes.clone());
        }

        let bytes = instances.get_data_bytes(&self.instance.id, element_id).await?;
        self.fetched.lock().await.insert(element_id, bytes.clone());
        Ok(bytes)
    }
}

/// Metadata overrides resolved for one instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveMetadata {
    pub case_file_id: Option<String>,
    pub case_file_title: Option<String>,
    pub journal_entry_title: Option<String>,
    pub system_id: Option<String>,
    pub rule_id: Option<String>,
}

/// Resolves archive settings for an instance
pub struct ConfigResolver {
    config: Arc<ArchivelinkConfig>,
    instances: Arc<dyn InstanceClient>,
    parties: Arc<dyn PartyRegistry>,
    orgs: Arc<dyn OrgRegistry>,
}

impl ConfigResolver {
    pub fn new(
        config: Arc<ArchivelinkConfig>,
        instances: Arc<dyn InstanceClient>,
        parties: Arc<dyn PartyRegistry>,
        orgs: Arc<dyn OrgRegistry>,
    ) -> Self {
        Self {
            config,
            instances,
            parties,
            orgs,
        }
    }

    pub fn config(&self) -> &ArchivelinkConfig {
        &self.config
    }

    /// Resolves the archive recipient
    ///
    /// For each field a literal value wins over a binding.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Configuration`] if the account, identifier or
    /// name resolves to nothing, or the account is not a UUID. Returns
    /// [`ArchiveError::Domain`] if bound form data cannot be read.
    pub async fn get_recipient(&self, data: &InstanceData<'_>) -> Result<Recipient> {
        let settings = &self.config.archive.recipient;
        let mut bindings = BindingContext::new(self, data);

        let account = bindings.resolve(&settings.account).await?;
        let account_id = match account {
            Some(Resolved::Literal(id)) => id,
            Some(Resolved::Bound(text)) => Uuid::parse_str(&text).map_err(|_| {
                ArchiveError::Configuration(format!(
                    "Recipient account '{text}' from data binding is not a valid UUID"
                ))
            })?,
            None => {
                return Err(ArchiveError::Configuration(
                    "Recipient account could not be resolved from value or data binding"
                        .to_string(),
                ))
            }
        };

        let identifier = bindings
            .resolve_text(&settings.identifier)
            .await?
            .ok_or_else(|| {
                ArchiveError::Configuration(
                    "Recipient identifier could not be resolved from value or data binding"
                        .to_string(),
                )
            })?;

        let name = bindings.resolve_text(&settings.name).await?.ok_or_else(|| {
            ArchiveError::Configuration(
                "Recipient name could not be resolved from value or data binding".to_string(),
            )
        })?;

        let org_number = match &settings.org_number {
            Some(value) => bindings.resolve_text(value).await?,
            None => None,
        };

        Ok(Recipient {
            account_id,
            identifier,
            name,
            org_number,
        })
    }

    /// Resolves the metadata overrides, `None` when none are configured
    pub async fn get_config_metadata(
        &self,
        data: &InstanceData<'_>,
    ) -> Result<Option<ArchiveMetadata>> {
        let Some(settings) = &self.config.archive.metadata else {
            return Ok(None);
        };

        let mut bindings = BindingContext::new(self, data);
        Ok(Some(ArchiveMetadata {
            case_file_id: bindings.resolve_optional(&settings.case_file_id).await?,
            case_file_title: bindings.resolve_optional(&settings.case_file_title).await?,
            journal_entry_title: bindings
                .resolve_optional(&settings.journal_entry_title)
                .await?,
            system_id: bindings.resolve_optional(&settings.system_id).await?,
            rule_id: bindings.resolve_optional(&settings.rule_id).await?,
        }))
    }

    /// Instance URL, used as correlation id and recipient reference
    pub fn correlation_id(&self, instance: &Instance) -> String {
        format!(
            "{}instances/{}",
            self.config.application.app_base_url(),
            instance.id
        )
    }

    /// Recipient as correspondence party
    pub fn get_recipient_party(&self, instance: &Instance, recipient: &Recipient) -> CorrespondenceParty {
        CorrespondenceParty::recipient(&recipient.identifier, &recipient.name)
            .with_organisation_id(recipient.org_number.clone())
            .with_reference(self.correlation_id(instance))
    }

    /// Service owner as sending party
    ///
    /// Registry failures are logged; the party then carries the org code only.
    pub async fn get_service_owner_party(&self) -> CorrespondenceParty {
        let org = &self.config.application.org;

        let details = match self.orgs.get_org(org).await {
            Ok(details) => details,
            Err(e) => {
                tracing::error!(org = %org, error = %e, "Unable to get service owner details");
                None
            }
        };

        let id = details
            .as_ref()
            .and_then(|d| d.orgnr.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| org.clone());
        let name = details
            .as_ref()
            .and_then(|d| d.preferred_name())
            .map(str::to_string)
            .unwrap_or_else(|| org.clone());

        CorrespondenceParty::sender(id, name)
    }

    /// Instance owner as sending party
    ///
    /// Returns `None`, after logging, when the owner cannot be looked up.
    pub async fn get_instance_owner_party(&self, instance: &Instance) -> Option<CorrespondenceParty> {
        let party_id = instance.id.party_id();

        let party = match self.parties.get_party(party_id).await {
            Ok(party) => party,
            Err(e) => {
                tracing::error!(party_id, error = %e, "Could not retrieve instance owner party");
                return None;
            }
        };

        let name = party
            .name
            .clone()
            .or_else(|| party.organization.as_ref().and_then(|o| o.name.clone()))
            .or_else(|| party.person.as_ref().and_then(|p| p.name.clone()))
            .filter(|n| !n.trim().is_empty());
        let Some(name) = name else {
            tracing::warn!(party_id, "Instance owner party has no name");
            return None;
        };

        let sender = CorrespondenceParty::sender(party.party_id.to_string(), name);
        let sender = if let Some(org) = party.organization {
            sender
                .with_organisation_id(party.org_number.or(org.org_number))
                .with_contact_info(
                    org.telephone_number,
                    org.mobile_number,
                    org.mailing_address,
                    org.mailing_postal_code,
                    org.mailing_postal_city,
                )
        } else if let Some(person) = party.person {
            sender.with_person_id(party.ssn).with_contact_info(
                person.telephone_number,
                person.mobile_number,
                person.mailing_address,
                person.mailing_postal_code,
                person.mailing_postal_city,
            )
        } else {
            sender
                .with_organisation_id(party.org_number)
                .with_person_id(party.ssn)
        };

        Some(sender)
    }

    /// Classification of whoever submitted the form
    pub fn get_form_submitter_classification(&self, principal: &Principal) -> Classification {
        match principal {
            Principal::User { ssn, name, .. } => Classification {
                system: "Fødselsnummer".to_string(),
                class_id: ssn.clone(),
                title: name.clone(),
            },
            Principal::SelfIdentifiedUser { user_id, username } => Classification {
                system: "AltinnBrukerId".to_string(),
                class_id: user_id.to_string(),
                title: Some(username.clone()),
            },
            Principal::SystemUser {
                system_user_id,
                org_number,
            } => Classification {
                system: "SystembrukerId".to_string(),
                class_id: system_user_id.to_string(),
                title: Some(org_number.clone()),
            },
            Principal::Org { org_number } => Classification {
                system: "Organisasjonsnummer".to_string(),
                class_id: org_number.clone(),
                title: None,
            },
            Principal::ServiceOwner { org, org_number } => Classification {
                system: "Organisasjonsnummer".to_string(),
                class_id: org_number.clone(),
                title: Some(org.clone()),
            },
        }
    }
}

enum Resolved<T> {
    Literal(T),
    Bound(String),
}

/// Resolves bindings for one instance, parsing each data type once
struct BindingContext<'a, 'i> {
    resolver: &'a ConfigResolver,
    data: &'a InstanceData<'i>,
    form_data: HashMap<String, Option<FormData>>,
}

impl<'a, 'i> BindingContext<'a, 'i> {
    fn new(resolver: &'a ConfigResolver, data: &'a InstanceData<'i>) -> Self {
        Self {
            resolver,
            data,
            form_data: HashMap::new(),
        }
    }

    async fn resolve<T: Clone>(&mut self, value: &BindableValue<T>) -> Result<Option<Resolved<T>>> {
        if let Some(literal) = &value.value {
            return Ok(Some(Resolved::Literal(literal.clone())));
        }
        match &value.binding {
            Some(binding) => Ok(self.lookup(binding).await?.map(Resolved::Bound)),
            None => Ok(None),
        }
    }

    async fn resolve_text(&mut self, value: &BindableValue<String>) -> Result<Option<String>> {
        Ok(match self.resolve(value).await? {
            Some(Resolved::Literal(text)) => Some(text).filter(|t| !t.trim().is_empty()),
            Some(Resolved::Bound(text)) => Some(text),
            None => None,
        })
    }

    async fn resolve_optional(
        &mut self,
        value: &Option<BindableValue<String>>,
    ) -> Result<Option<String>> {
        match value {
            Some(value) => self.resolve_text(value).await,
            None => Ok(None),
        }
    }

    async fn lookup(&mut self, binding: &DataBinding) -> Result<Option<String>> {
        if !self.form_data.contains_key(&binding.data_type) {
            let loaded = self.load(&binding.data_type).await?;
            self.form_data.insert(binding.data_type.clone(), loaded);
        }

        let value = self
            .form_data
            .get(&binding.data_type)
            .and_then(Option::as_ref)
            .and_then(|data| data.get_text(&binding.field));

        if value.is_none() {
            tracing::debug!(
                data_type = %binding.data_type,
                field = %binding.field,
                "Data binding resolved to no value"
            );
        }
        Ok(value)
    }

    async fn load(&self, data_type: &str) -> Result<Option<FormData>> {
        let instance = self.data.instance();
        let Some(element) = instance.data_elements_of(data_type).next() else {
            tracing::warn!(
                instance_id = %instance.id,
                data_type,
                "Instance has no data element for bound data type"
            );
            return Ok(None);
        };

        let bytes = self
            .data
            .bytes(self.resolver.instances.as_ref(), element.id)
            .await?;
        FormData::parse(&bytes, element.content_type.as_deref()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::platform::{Organization, OrgDetails, Party, Person};
    use crate::config::DataBinding;
    use crate::test_support::{
        sample_config, sample_instance, FakeInstanceClient, FakeOrgRegistry, FakePartyRegistry,
        MODEL_ELEMENT_ID,
    };

    fn resolver_with(
        config: ArchivelinkConfig,
        instances: Arc<FakeInstanceClient>,
        parties: FakePartyRegistry,
        orgs: FakeOrgRegistry,
    ) -> ConfigResolver {
        ConfigResolver::new(Arc::new(config), instances, Arc::new(parties), Arc::new(orgs))
    }

    fn resolver(config: ArchivelinkConfig) -> ConfigResolver {
        resolver_with(
            config,
            Arc::new(FakeInstanceClient::with_instance(sample_instance())),
            FakePartyRegistry::default(),
            FakeOrgRegistry::default(),
        )
    }

    #[tokio::test]
    async fn test_literal_recipient() {
        let recipient = resolver(sample_config())
            .get_recipient(&InstanceData::new(&sample_instance()))
            .await
            .unwrap();
        assert_eq!(recipient.account_id, Uuid::from_u128(3));
        assert_eq!(recipient.identifier, "KOMMUNE");
        assert_eq!(recipient.name, "Kommunen");
        assert_eq!(recipient.org_number, None);
    }

    #[tokio::test]
    async fn test_bound_recipient_reads_form_data_once() {
        let mut config = sample_config();
        config.archive.recipient.account =
            BindableValue::bound(DataBinding::new("model", "recipient.account"));
        config.archive.recipient.name =
            BindableValue::bound(DataBinding::new("model", "recipient.name"));
        config.archive.recipient.org_number = Some(BindableValue::bound(DataBinding::new(
            "model",
            "recipient.orgNumber",
        )));

        let instances = Arc::new(FakeInstanceClient::with_instance(sample_instance()));
        let resolver = resolver_with(
            config,
            instances.clone(),
            FakePartyRegistry::default(),
            FakeOrgRegistry::default(),
        );

        let instance = sample_instance();
        let recipient = resolver
            .get_recipient(&InstanceData::new(&instance))
            .await
            .unwrap();
        assert_eq!(recipient.account_id, Uuid::from_u128(0xA));
        assert_eq!(recipient.name, "Bygdeby kommune");
        assert_eq!(recipient.org_number.as_deref(), Some("944000111"));
        assert_eq!(instances.data_reads(), vec![MODEL_ELEMENT_ID]);
    }

    #[tokio::test]
    async fn test_recipient_and_metadata_share_one_read() {
        let mut config = sample_config();
        config.archive.recipient.name =
            BindableValue::bound(DataBinding::new("model", "recipient.name"));
        config.archive.metadata = Some(crate::config::MetadataConfig {
            case_file_title: Some(BindableValue::bound(DataBinding::new("model", "title"))),
            ..Default::default()
        });

        let instances = Arc::new(FakeInstanceClient::with_instance(sample_instance()));
        let resolver = resolver_with(
            config,
            instances.clone(),
            FakePartyRegistry::default(),
            FakeOrgRegistry::default(),
        );

        let instance = sample_instance();
        let data = InstanceData::new(&instance);
        let recipient = resolver.get_recipient(&data).await.unwrap();
        let metadata = resolver.get_config_metadata(&data).await.unwrap().unwrap();

        assert_eq!(recipient.name, "Bygdeby kommune");
        assert_eq!(metadata.case_file_title.as_deref(), Some("Søknad om tillatelse"));
        assert_eq!(instances.data_reads(), vec![MODEL_ELEMENT_ID]);
    }

    #[tokio::test]
    async fn test_literal_wins_over_binding() {
        let mut config = sample_config();
        config.archive.recipient.name = BindableValue {
            value: Some("Literal".to_string()),
            binding: Some(DataBinding::new("model", "recipient.name")),
        };
        let recipient = resolver(config)
            .get_recipient(&InstanceData::new(&sample_instance()))
            .await
            .unwrap();
        assert_eq!(recipient.name, "Literal");
    }

    #[tokio::test]
    async fn test_unresolvable_recipient_is_configuration_error() {
        let mut config = sample_config();
        config.archive.recipient.account =
            BindableValue::bound(DataBinding::new("model", "recipient.missing"));
        let result = resolver(config)
            .get_recipient(&InstanceData::new(&sample_instance()))
            .await;
        assert!(matches!(result, Err(ArchiveError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_binding_to_absent_data_type_is_configuration_error() {
        let mut config = sample_config();
        config.archive.recipient.identifier =
            BindableValue::bound(DataBinding::new("other-model", "recipient.id"));
        let result = resolver(config)
            .get_recipient(&InstanceData::new(&sample_instance()))
            .await;
        assert!(matches!(result, Err(ArchiveError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_bound_account_must_be_uuid() {
        let mut config = sample_config();
        config.archive.recipient.account =
            BindableValue::bound(DataBinding::new("model", "recipient.name"));
        let err = resolver(config)
            .get_recipient(&InstanceData::new(&sample_instance()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a valid UUID"));
    }

    #[tokio::test]
    async fn test_metadata_absent_is_none() {
        let metadata = resolver(sample_config())
            .get_config_metadata(&InstanceData::new(&sample_instance()))
            .await
            .unwrap();
        assert!(metadata.is_none());
    }

    #[tokio::test]
    async fn test_metadata_mixes_literal_and_bound() {
        let mut config = sample_config();
        config.archive.metadata = Some(crate::config::MetadataConfig {
            case_file_title: Some(BindableValue::bound(DataBinding::new("model", "title"))),
            system_id: Some(BindableValue::literal("Skjemasystem".to_string())),
            ..Default::default()
        });

        let metadata = resolver(config)
            .get_config_metadata(&InstanceData::new(&sample_instance()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.case_file_title.as_deref(), Some("Søknad om tillatelse"));
        assert_eq!(metadata.system_id.as_deref(), Some("Skjemasystem"));
        assert_eq!(metadata.journal_entry_title, None);
    }

    #[tokio::test]
    async fn test_service_owner_party_from_registry() {
        let mut orgs = FakeOrgRegistry::default();
        orgs.insert(
            "ttd",
            OrgDetails {
                name: [("nb".to_string(), "Testdepartementet".to_string())].into(),
                orgnr: Some("991825827".to_string()),
            },
        );
        let resolver = resolver_with(
            sample_config(),
            Arc::new(FakeInstanceClient::with_instance(sample_instance())),
            FakePartyRegistry::default(),
            orgs,
        );

        let party = resolver.get_service_owner_party().await;
        assert_eq!(party.party_type.code, "EA");
        assert_eq!(party.id, "991825827");
        assert_eq!(party.name, "Testdepartementet");
    }

    #[tokio::test]
    async fn test_service_owner_party_degrades_to_org_code() {
        let resolver = resolver_with(
            sample_config(),
            Arc::new(FakeInstanceClient::with_instance(sample_instance())),
            FakePartyRegistry::default(),
            FakeOrgRegistry::failing(),
        );
        let party = resolver.get_service_owner_party().await;
        assert_eq!(party.id, "ttd");
        assert_eq!(party.name, "ttd");
    }

    #[tokio::test]
    async fn test_instance_owner_party() {
        let organisation = Party {
            party_id: 501337,
            name: Some("Eldste Fiskeforretning AS".to_string()),
            org_number: Some("910011223".to_string()),
            organization: Some(Organization {
                telephone_number: Some("22000000".to_string()),
                mailing_address: Some("Kaia 1".to_string()),
                mailing_postal_code: Some("0150".to_string()),
                mailing_postal_city: Some("Oslo".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolver = resolver_with(
            sample_config(),
            Arc::new(FakeInstanceClient::with_instance(sample_instance())),
            FakePartyRegistry::with_party(organisation),
            FakeOrgRegistry::default(),
        );

        let party = resolver
            .get_instance_owner_party(&sample_instance())
            .await
            .unwrap();
        assert_eq!(party.id, "501337");
        assert_eq!(party.organisation_id.as_deref(), Some("910011223"));
        assert_eq!(party.address.unwrap().city.as_deref(), Some("Oslo"));
        assert_eq!(party.contact.unwrap().phone.as_deref(), Some("22000000"));
    }

    #[tokio::test]
    async fn test_instance_owner_person() {
        let person = Party {
            party_id: 501337,
            name: Some("Ola Nordmann".to_string()),
            ssn: Some("01017012345".to_string()),
            person: Some(Person {
                mobile_number: Some("99999999".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolver = resolver_with(
            sample_config(),
            Arc::new(FakeInstanceClient::with_instance(sample_instance())),
            FakePartyRegistry::with_party(person),
            FakeOrgRegistry::default(),
        );

        let party = resolver
            .get_instance_owner_party(&sample_instance())
            .await
            .unwrap();
        assert_eq!(party.person_id.as_deref(), Some("01017012345"));
        assert!(party.organisation_id.is_none());
        assert!(party.address.is_none());
    }

    #[tokio::test]
    async fn test_instance_owner_lookup_failure_is_none() {
        let party = resolver(sample_config())
            .get_instance_owner_party(&sample_instance())
            .await;
        assert!(party.is_none());
    }

    #[test]
    fn test_submitter_classification_per_principal() {
        let resolver = resolver(sample_config());
        let cases = [
            (
                Principal::User {
                    user_id: 1,
                    ssn: "01017012345".to_string(),
                    name: Some("Ola".to_string()),
                },
                "Fødselsnummer",
                "01017012345",
            ),
            (
                Principal::SelfIdentifiedUser {
                    user_id: 1337,
                    username: "kari".to_string(),
                },
                "AltinnBrukerId",
                "1337",
            ),
            (
                Principal::SystemUser {
                    system_user_id: Uuid::from_u128(7),
                    org_number: "910011223".to_string(),
                },
                "SystembrukerId",
                "00000000-0000-0000-0000-000000000007",
            ),
            (
                Principal::Org {
                    org_number: "910011223".to_string(),
                },
                "Organisasjonsnummer",
                "910011223",
            ),
            (
                Principal::ServiceOwner {
                    org: "ttd".to_string(),
                    org_number: "991825827".to_string(),
                },
                "Organisasjonsnummer",
                "991825827",
            ),
        ];

        for (principal, system, class_id) in cases {
            let classification = resolver.get_form_submitter_classification(&principal);
            assert_eq!(classification.system, system);
            assert_eq!(classification.class_id, class_id);
        }
    }

    #[test]
    fn test_correlation_id_is_instance_url() {
        let instance = sample_instance();
        assert_eq!(
            resolver(sample_config()).correlation_id(&instance),
            format!("https://ttd.apps.altinn.no/ttd/my-app/instances/{}", instance.id)
        );
    }
}
