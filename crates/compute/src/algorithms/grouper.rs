use indexmap::IndexMap;
use triage_core::{AlertRecord, CaseKey};

/// Records of one case, ordered by occurrence.
#[derive(Debug, Clone)]
pub struct CaseGroup<'a> {
    pub key: &'a CaseKey,
    pub records: Vec<&'a AlertRecord>,
}

impl CaseGroup<'_> {
    pub fn alert_count(&self) -> usize {
        self.records.len()
    }
}

/// Partition records into cases by exact key equality.
///
/// Groups come out in order of first appearance. Inside a group, records are
/// sorted by `(created_on, input position)` so equal timestamps keep their
/// input order. Every record lands in exactly one group.
pub fn group_cases(records: &[AlertRecord]) -> Vec<CaseGroup<'_>> {
    let mut groups: IndexMap<&CaseKey, Vec<(usize, &AlertRecord)>> = IndexMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups.entry(&record.key).or_default().push((idx, record));
    }

    groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by_key(|(idx, r)| (r.created_on, *idx));
            CaseGroup {
                key,
                records: members.into_iter().map(|(_, r)| r).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use triage_core::RemediationPresence;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(node: &str, hour: u32, number: &str) -> AlertRecord {
        AlertRecord {
            key: CaseKey {
                assignment_group: "SQUAD_A".into(),
                short_description: "Disk full".into(),
                node: node.into(),
                cmdb_ci: "ci".into(),
                source: "zabbix".into(),
                metric_name: "disk".into(),
                cmdb_ci_class: "server".into(),
            },
            created_on: at(hour),
            severity: "Alto".into(),
            priority_group: "Urgente".into(),
            remediation: RemediationPresence::NoStatus,
            task_status: None,
            number: number.into(),
        }
    }

    fn numbers(group: &CaseGroup<'_>) -> Vec<String> {
        group.records.iter().map(|r| r.number.clone()).collect()
    }

    #[test]
    fn groups_by_key_in_first_seen_order() {
        let records = vec![
            record("srv2", 3, "A"),
            record("srv1", 1, "B"),
            record("srv2", 1, "C"),
        ];
        let groups = group_cases(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.node, "srv2");
        assert_eq!(numbers(&groups[0]), vec!["C", "A"]);
        assert_eq!(groups[1].alert_count(), 1);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let records = vec![
            record("srv1", 5, "first"),
            record("srv1", 2, "early"),
            record("srv1", 5, "second"),
            record("srv1", 5, "third"),
        ];
        let groups = group_cases(&records);
        assert_eq!(numbers(&groups[0]), vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn key_comparison_is_case_sensitive() {
        let records = vec![record("srv1", 1, "A"), record("SRV1", 1, "B")];
        assert_eq!(group_cases(&records).len(), 2);
    }

    #[test]
    fn no_record_is_dropped() {
        let records: Vec<_> = (0..20)
            .map(|i| record(&format!("srv{}", i % 3), i % 7, &i.to_string()))
            .collect();
        let total: usize = group_cases(&records).iter().map(|g| g.alert_count()).sum();
        assert_eq!(total, records.len());
        assert!(group_cases(&[]).is_empty());
    }
}
