use crate::core::{Amount, FieldMapping, PatchOperation, WorkItemEstimate};
use serde_json::Value;
use std::collections::HashMap;

/// `quantity * months * unit_value`, or `None` when any input is absent.
///
/// Zero is a present value.
pub fn compute_total(
    quantity: Option<Amount>,
    months: Option<Amount>,
    unit_value: Option<Amount>,
) -> Option<Amount> {
    Some(quantity?.checked_mul(months?).checked_mul(unit_value?))
}

impl WorkItemEstimate {
    pub fn new(
        quantity: Option<Amount>,
        months: Option<Amount>,
        unit_value: Option<Amount>,
    ) -> Self {
        Self {
            quantity,
            months,
            unit_value,
        }
    }

    pub fn from_fields(fields: &HashMap<String, Value>, mapping: &FieldMapping) -> Self {
        let read = |name: &str| fields.get(name).and_then(Amount::from_json);
        Self {
            quantity: read(&mapping.quantity),
            months: read(&mapping.months),
            unit_value: read(&mapping.unit_value),
        }
    }

    pub fn total(&self) -> Option<Amount> {
        compute_total(self.quantity, self.months, self.unit_value)
    }

    pub fn missing_fields<'a>(&self, mapping: &'a FieldMapping) -> Vec<&'a str> {
        [
            (self.quantity.is_none(), mapping.quantity.as_str()),
            (self.months.is_none(), mapping.months.as_str()),
            (self.unit_value.is_none(), mapping.unit_value.as_str()),
        ]
        .into_iter()
        .filter_map(|(missing, name)| missing.then_some(name))
        .collect()
    }

    /// The patch document that writes the total back, if there is one to write.
    ///
    /// A total that is not a finite number has no JSON form and yields `None`.
    pub fn update_document(&self, mapping: &FieldMapping) -> Option<Vec<PatchOperation>> {
        let value = self.total()?.to_json()?;
        Some(vec![PatchOperation::add(mapping.total_path(), value)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int(value: i64) -> Amount {
        Amount::Integer(value)
    }

    fn dec(value: f64) -> Amount {
        Amount::Decimal(value)
    }

    fn fields(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_compute_total_all_present() {
        assert_eq!(
            compute_total(Some(int(10)), Some(int(3)), Some(int(100))),
            Some(Amount::Integer(3000))
        );
    }

    #[test]
    fn test_compute_total_missing_quantity() {
        assert_eq!(compute_total(None, Some(int(3)), Some(int(100))), None);
    }

    #[test]
    fn test_compute_total_any_missing_input() {
        let q = Some(Amount::Integer(2));
        assert_eq!(compute_total(q, None, q), None);
        assert_eq!(compute_total(q, q, None), None);
        assert_eq!(compute_total(None, None, None), None);
    }

    #[test]
    fn test_compute_total_zero_is_present() {
        assert_eq!(
            compute_total(Some(int(0)), Some(int(5)), Some(int(20))),
            Some(Amount::Integer(0))
        );
    }

    #[test]
    fn test_compute_total_decimal_inputs() {
        assert_eq!(
            compute_total(Some(int(2)), Some(int(12)), Some(dec(1500.5))),
            Some(Amount::Decimal(2.0 * 12.0 * 1500.5))
        );
        assert_eq!(
            compute_total(Some(dec(0.1)), Some(dec(0.2)), Some(int(3))),
            Some(Amount::Decimal(0.1 * 0.2 * 3.0))
        );
    }

    #[test]
    fn test_compute_total_matches_product_for_sample_triples() {
        for q in [-3i64, 0, 1, 7, 250] {
            for m in [0i64, 1, 12, 36] {
                for u in [0i64, 99, 12_500] {
                    assert_eq!(
                        compute_total(Some(q.into()), Some(m.into()), Some(u.into())),
                        Some(Amount::Integer(q * m * u))
                    );
                }
            }
        }
    }

    #[test]
    fn test_estimate_from_fields_uses_mapping() {
        let mapping = FieldMapping::default();
        let estimate = WorkItemEstimate::from_fields(
            &fields(&[
                ("Custom.Cantidad", json!(10)),
                ("Custom.Meses", json!(3)),
                ("Custom.Valorunitario", json!(100)),
                ("System.Title", json!("Licencias")),
            ]),
            &mapping,
        );

        assert_eq!(estimate.total(), Some(Amount::Integer(3000)));
        assert!(estimate.missing_fields(&mapping).is_empty());
    }

    #[test]
    fn test_estimate_non_numeric_field_counts_as_missing() {
        let mapping = FieldMapping::default();
        let estimate = WorkItemEstimate::from_fields(
            &fields(&[
                ("Custom.Cantidad", json!("diez")),
                ("Custom.Meses", json!(3)),
            ]),
            &mapping,
        );

        assert_eq!(estimate.total(), None);
        assert_eq!(
            estimate.missing_fields(&mapping),
            vec!["Custom.Cantidad", "Custom.Valorunitario"]
        );
        assert!(estimate.update_document(&mapping).is_none());
    }

    #[test]
    fn test_update_document_targets_total_field() {
        let mapping = FieldMapping::default();
        let estimate = WorkItemEstimate::new(Some(int(10)), Some(int(3)), Some(int(100)));

        let document = estimate.update_document(&mapping).unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!([{"op": "add", "path": "/fields/Custom.ValorTotal", "value": 3000}])
        );
    }

    #[test]
    fn test_update_document_none_for_non_finite_total() {
        let mapping = FieldMapping::default();
        let estimate = WorkItemEstimate::new(Some(dec(1e200)), Some(dec(1e200)), Some(int(1)));

        let total = estimate.total().unwrap();
        assert!(!total.is_finite());
        assert!(estimate.missing_fields(&mapping).is_empty());
        assert_eq!(estimate.update_document(&mapping), None);
    }

    #[test]
    fn test_update_document_is_idempotent() {
        let mapping = FieldMapping::default();
        let estimate = WorkItemEstimate::new(Some(int(4)), Some(int(6)), Some(dec(2.5)));

        assert_eq!(estimate.total(), estimate.total());
        assert_eq!(
            estimate.update_document(&mapping),
            estimate.update_document(&mapping)
        );
    }
}
