//! Archive record model
//!
//! Serializes to the national archive's `arkivmelding` schema. Element names
//! are fixed by that schema; field names here are English.

use serde::Serialize;

pub const ARCHIVE_RECORD_NAMESPACE: &str =
    "https://ks-no.github.io/standarder/fiks-protokoll/fiks-arkiv/arkivmelding/opprett/v1";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// System id of the hosting platform in archive records
pub const PLATFORM_SYSTEM_ID: &str = "Altinn";

/// Organisation number of the hosting platform
pub const PLATFORM_ORG_NUMBER: &str = "991825827";

/// A code with its description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Code {
    #[serde(rename = "kode")]
    pub code: String,

    #[serde(rename = "beskrivelse", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Code {
    pub fn new(code: &str, description: &str) -> Self {
        Self {
            code: code.to_string(),
            description: Some(description.to_string()),
        }
    }

    pub fn bare(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
        }
    }
}

/// Code lists used by the record
pub mod codes {
    use super::Code;

    pub fn incoming_document() -> Code {
        Code::new("I", "Inngående dokument")
    }

    pub fn journalled() -> Code {
        Code::new("J", "Journalført")
    }

    pub fn document() -> Code {
        Code::new("DOKUMENT", "Dokument")
    }

    pub fn attachment() -> Code {
        Code::new("VEDLEGG", "Vedlegg")
    }

    pub fn finished() -> Code {
        Code::new("F", "Ferdig")
    }

    pub fn main_document() -> Code {
        Code::new("H", "Hoveddokument")
    }

    pub fn attached_document() -> Code {
        Code::new("V", "Vedlegg")
    }

    pub fn production_format() -> Code {
        Code::new("P", "Produksjonsformat")
    }

    pub fn sender() -> Code {
        Code::new("EA", "Avsender")
    }

    pub fn recipient() -> Code {
        Code::new("EM", "Mottaker")
    }

    pub fn internal_sender() -> Code {
        Code::new("IA", "Intern avsender")
    }
}

/// Root `arkivmelding` element
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "arkivmelding")]
pub struct ArchiveRecord {
    #[serde(rename = "@xmlns")]
    pub namespace: &'static str,

    #[serde(rename = "@xmlns:xsi")]
    pub xsi_namespace: &'static str,

    pub system: String,

    #[serde(rename = "regel", skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    #[serde(rename = "antallFiler")]
    pub file_count: usize,

    #[serde(rename = "mappe")]
    pub case_file: CaseFile,

    #[serde(rename = "registrering")]
    pub journal_entry: JournalEntry,
}

impl ArchiveRecord {
    /// Creates a record whose file count matches the journal entry's documents
    pub fn new(
        system: String,
        rule: Option<String>,
        case_file: CaseFile,
        journal_entry: JournalEntry,
    ) -> Self {
        Self {
            namespace: ARCHIVE_RECORD_NAMESPACE,
            xsi_namespace: XSI_NAMESPACE,
            system,
            rule,
            file_count: journal_entry.documents.len(),
            case_file,
            journal_entry,
        }
    }

    /// Serializes to indented XML with a declaration
    pub fn to_xml(&self) -> Result<String, quick_xml::DeError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 2);
        self.serialize(serializer)?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalKey {
    #[serde(rename = "fagsystem")]
    pub system: String,

    #[serde(rename = "noekkel")]
    pub key: String,
}

/// Submitter classification on the case file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    #[serde(rename = "klassifikasjonssystem")]
    pub system: String,

    #[serde(rename = "klasseID")]
    pub class_id: String,

    #[serde(rename = "tittel", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdministrativeUnit {
    #[serde(rename = "navn")]
    pub name: String,
}

/// `saksmappe`
#[derive(Debug, Clone, Serialize)]
pub struct CaseFile {
    #[serde(rename = "@xsi:type")]
    pub xsi_type: &'static str,

    #[serde(rename = "tittel")]
    pub title: String,

    #[serde(rename = "offentligTittel")]
    pub public_title: String,

    #[serde(rename = "referanseEksternNoekkel")]
    pub external_key: ExternalKey,

    #[serde(rename = "klassifikasjon")]
    pub classifications: Vec<Classification>,

    #[serde(rename = "saksaar")]
    pub case_year: i32,

    #[serde(rename = "saksdato")]
    pub case_date: String,

    #[serde(rename = "administrativEnhet")]
    pub administrative_unit: AdministrativeUnit,
}

impl CaseFile {
    pub const XSI_TYPE: &'static str = "saksmappe";
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentReference {
    #[serde(rename = "referanseEksternNoekkel")]
    pub external_key: ExternalKey,
}

/// `journalpost`
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    #[serde(rename = "@xsi:type")]
    pub xsi_type: &'static str,

    #[serde(rename = "tittel")]
    pub title: String,

    #[serde(rename = "offentligTittel")]
    pub public_title: String,

    #[serde(rename = "opprettetAv")]
    pub created_by: String,

    #[serde(rename = "arkivertAv")]
    pub archived_by: String,

    #[serde(rename = "referanseForelderMappe")]
    pub parent: ParentReference,

    #[serde(rename = "dokumentbeskrivelse")]
    pub documents: Vec<DocumentDescription>,

    #[serde(rename = "referanseEksternNoekkel")]
    pub external_key: ExternalKey,

    #[serde(rename = "journalaar")]
    pub journal_year: i32,

    #[serde(rename = "journalposttype")]
    pub entry_type: Code,

    #[serde(rename = "journalstatus")]
    pub status: Code,

    #[serde(rename = "dokumentetsDato")]
    pub document_date: String,

    #[serde(rename = "sendtDato")]
    pub sent_date: String,

    #[serde(rename = "korrespondansepart")]
    pub parties: Vec<CorrespondenceParty>,
}

impl JournalEntry {
    pub const XSI_TYPE: &'static str = "journalpost";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostalAddress {
    #[serde(rename = "adresselinje1", skip_serializing_if = "Option::is_none")]
    pub address_line: Option<String>,

    #[serde(rename = "postnr", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(rename = "poststed", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    #[serde(rename = "telefonnummer", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(rename = "mobiltelefon", skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,

    #[serde(rename = "epostadresse", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// `korrespondansepart`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrespondenceParty {
    #[serde(rename = "korrespondanseparttype")]
    pub party_type: Code,

    #[serde(rename = "korrespondansepartID")]
    pub id: String,

    #[serde(rename = "korrespondansepartNavn")]
    pub name: String,

    #[serde(rename = "organisasjonid", skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<String>,

    #[serde(rename = "personid", skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,

    #[serde(rename = "postadresse", skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,

    #[serde(rename = "kontaktinformasjon", skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,

    #[serde(rename = "deresReferanse", skip_serializing_if = "Option::is_none")]
    pub your_reference: Option<String>,
}

impl CorrespondenceParty {
    fn new(party_type: Code, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            party_type,
            id: id.into(),
            name: name.into(),
            organisation_id: None,
            person_id: None,
            address: None,
            contact: None,
            your_reference: None,
        }
    }

    pub fn sender(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(codes::sender(), id, name)
    }

    pub fn recipient(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(codes::recipient(), id, name)
    }

    /// The hosting platform as internal sender
    pub fn internal_sender() -> Self {
        Self::new(codes::internal_sender(), PLATFORM_ORG_NUMBER, PLATFORM_SYSTEM_ID)
    }

    pub fn with_organisation_id(mut self, organisation_id: Option<String>) -> Self {
        self.organisation_id = organisation_id.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_person_id(mut self, person_id: Option<String>) -> Self {
        self.person_id = person_id.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.your_reference = Some(reference.into());
        self
    }

    /// Adds address and phone numbers; empty parts are dropped
    pub fn with_contact_info(
        mut self,
        phone: Option<String>,
        mobile: Option<String>,
        address: Option<String>,
        postal_code: Option<String>,
        city: Option<String>,
    ) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let address = PostalAddress {
            address_line: present(address),
            postal_code: present(postal_code),
            city: present(city),
        };
        if address != PostalAddress::default() {
            self.address = Some(address);
        }

        let contact = ContactInfo {
            phone: present(phone),
            mobile: present(mobile),
            email: None,
        };
        if contact != ContactInfo::default() {
            self.contact = Some(contact);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemIdElement {
    #[serde(rename = "@label")]
    pub label: String,

    #[serde(rename = "$text")]
    pub value: String,
}

/// `dokumentobjekt`
#[derive(Debug, Clone, Serialize)]
pub struct DocumentObject {
    #[serde(rename = "systemID")]
    pub system_id: SystemIdElement,

    #[serde(rename = "variantformat")]
    pub variant: Code,

    pub format: Code,

    #[serde(rename = "filnavn")]
    pub filename: String,

    #[serde(rename = "referanseDokumentfil")]
    pub file_reference: String,
}

/// `dokumentbeskrivelse`
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDescription {
    #[serde(rename = "dokumenttype")]
    pub document_type: Code,

    #[serde(rename = "dokumentstatus")]
    pub status: Code,

    #[serde(rename = "tittel")]
    pub title: String,

    #[serde(rename = "opprettetDato")]
    pub created_date: String,

    #[serde(rename = "tilknyttetRegistreringSom")]
    pub attached_as: Code,

    #[serde(rename = "dokumentnummer")]
    pub number: usize,

    #[serde(rename = "dokumentobjekt")]
    pub objects: Vec<DocumentObject>,
}
