//! Canonical partner field schema
//!
//! The single list of tracked fields. The normalizer reads exactly these
//! fields and the version diff compares exactly these fields, so what is
//! stored and what is compared cannot drift apart.

/// How a payload value is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single string value
    Text,
    /// Unordered set of strings
    Tags,
}

/// One tracked field: stored name, payload key, and kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source_key: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str, source_key: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        source_key,
        kind: FieldKind::Text,
    }
}

const fn tags(name: &'static str, source_key: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        source_key,
        kind: FieldKind::Tags,
    }
}

/// Every field carried by a normalized partner record
pub const FIELDS: &[FieldSpec] = &[
    text("name", "name"),
    text("description", "description"),
    text("website", "url"),
    text("linkedin", "linkedInOrganizationProfile"),
    text("logo", "logo"),
    tags("industry_focus", "industryFocus"),
    tags("products", "product"),
    tags("services", "serviceType"),
    tags("solutions", "solutions"),
    tags("target_company_sizes", "targetCustomerCompanySizes"),
    tags("program_qualifications_msp", "programQualificationsMsp"),
    tags("program_qualifications_asp", "programQualificationsAsp"),
    tags("competencies", "competencies"),
    tags("competencies_gold", "competenciesGold"),
    tags("competencies_silver", "competenciesSilver"),
    text("competency_summary", "competencySummary"),
    tags("referral_programs", "referralPrograms"),
    tags("solutions_partner_designations", "solutionsPartnerDesignations"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names.len(), FIELDS.len());
    }

    #[test]
    fn test_payload_keys_map_to_stored_names() {
        let find = |name: &str| FIELDS.iter().find(|f| f.name == name);
        assert_eq!(find("website").map(|f| f.source_key), Some("url"));
        assert_eq!(find("products").map(|f| f.kind), Some(FieldKind::Tags));
        assert!(find("locations").is_none());
    }
}
