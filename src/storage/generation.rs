//! Generation Store
//!
//! Approved artifacts and their method contracts, scoped by feature id so a
//! rerun of the same feature replaces what the previous run stored.

use rusqlite::params;
use std::collections::{BTreeMap, BTreeSet};

use super::database::SharedDatabase;
use crate::types::{Result, ResultExt};

/// One approved class row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub fqcn: String,
    pub header_path: String,
    pub package: String,
    pub source_code: String,
    pub approved: bool,
}

/// One method row; only the name is required
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub method_name: String,
    pub signature: String,
    pub visibility: String,
    pub return_type: String,
    pub params: String,
}

impl MethodRecord {
    pub fn named(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            signature: String::new(),
            visibility: "public".to_string(),
            return_type: String::new(),
            params: String::new(),
        }
    }
}

#[derive(Clone)]
pub struct GenerationStore {
    db: SharedDatabase,
}

impl GenerationStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Remove every class and method stored for `feature_id`
    pub fn cleanup_feature(&self, feature_id: &str) -> Result<()> {
        self.db.transaction(|conn| {
            conn.execute("DELETE FROM gen_methods WHERE feature_id = ?1", [feature_id])?;
            conn.execute("DELETE FROM gen_classes WHERE feature_id = ?1", [feature_id])?;
            Ok(())
        })
    }

    pub fn insert_class(&self, feature_id: &str, class: &ClassRecord) -> Result<()> {
        self.db
            .connection()?
            .execute(
                "INSERT INTO gen_classes (feature_id, fqcn, header_path, package, source_code, approved)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    feature_id,
                    class.fqcn,
                    class.header_path,
                    class.package,
                    class.source_code,
                    class.approved
                ],
            )
            .with_context_fn(|| format!("Failed to store class {}", class.fqcn))?;
        Ok(())
    }

    /// Insert all rows in one transaction; an empty slice is a no-op
    pub fn insert_methods(&self, feature_id: &str, fqcn: &str, methods: &[MethodRecord]) -> Result<()> {
        if methods.is_empty() {
            return Ok(());
        }
        self.db.transaction(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO gen_methods (feature_id, fqcn, method_name, signature, visibility, return_type, params)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for m in methods {
                stmt.execute(params![
                    feature_id,
                    fqcn,
                    m.method_name,
                    m.signature,
                    m.visibility,
                    m.return_type,
                    m.params
                ])?;
            }
            Ok(())
        })
    }

    pub fn get_contract(&self, feature_id: &str, fqcn: &str) -> Result<BTreeSet<String>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT method_name FROM gen_methods WHERE feature_id = ?1 AND fqcn = ?2",
        )?;
        let names = stmt
            .query_map(params![feature_id, fqcn], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(names)
    }

    /// fqcn → method names in insertion order
    pub fn get_all_contracts(&self, feature_id: &str) -> Result<BTreeMap<String, Vec<String>>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT fqcn, method_name FROM gen_methods WHERE feature_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([feature_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut contracts: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            let (fqcn, method) = row?;
            contracts.entry(fqcn).or_default().push(method);
        }
        Ok(contracts)
    }

    pub fn list_classes(&self, feature_id: &str) -> Result<Vec<ClassRecord>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT fqcn, header_path, package, source_code, approved
             FROM gen_classes WHERE feature_id = ?1 ORDER BY id",
        )?;
        let classes = stmt
            .query_map([feature_id], |row| {
                Ok(ClassRecord {
                    fqcn: row.get(0)?,
                    header_path: row.get(1)?,
                    package: row.get(2)?,
                    source_code: row.get(3)?,
                    approved: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::sync::Arc;

    fn store() -> GenerationStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        GenerationStore::new(Arc::new(db))
    }

    fn class(fqcn: &str) -> ClassRecord {
        ClassRecord {
            fqcn: fqcn.to_string(),
            header_path: format!("src/main/java/{}.java", fqcn.replace('.', "/")),
            package: fqcn.rsplit_once('.').map(|(p, _)| p.to_string()).unwrap_or_default(),
            source_code: "class X {}".to_string(),
            approved: true,
        }
    }

    #[test]
    fn test_contracts_roundtrip() {
        let store = store();
        store.insert_class("reviews", &class("a.b.ReviewRepository")).unwrap();
        store
            .insert_methods(
                "reviews",
                "a.b.ReviewRepository",
                &[MethodRecord::named("findByProductId"), MethodRecord::named("countByRating")],
            )
            .unwrap();
        store
            .insert_methods("reviews", "a.b.ReviewService", &[MethodRecord::named("create")])
            .unwrap();
        store
            .insert_methods("other", "a.b.ReviewService", &[MethodRecord::named("delete")])
            .unwrap();

        let contract = store.get_contract("reviews", "a.b.ReviewRepository").unwrap();
        assert_eq!(
            contract.into_iter().collect::<Vec<_>>(),
            vec!["countByRating", "findByProductId"]
        );

        let all = store.get_all_contracts("reviews").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a.b.ReviewRepository"], vec!["findByProductId", "countByRating"]);
        assert_eq!(all["a.b.ReviewService"], vec!["create"]);

        let classes = store.list_classes("reviews").unwrap();
        assert_eq!(classes, vec![class("a.b.ReviewRepository")]);
    }

    #[test]
    fn test_cleanup_feature_is_scoped() {
        let store = store();
        store.insert_class("reviews", &class("a.b.Review")).unwrap();
        store.insert_methods("reviews", "a.b.Review", &[MethodRecord::named("getRating")]).unwrap();
        store.insert_methods("other", "a.b.Other", &[MethodRecord::named("run")]).unwrap();

        store.cleanup_feature("reviews").unwrap();

        assert!(store.get_all_contracts("reviews").unwrap().is_empty());
        assert!(store.list_classes("reviews").unwrap().is_empty());
        assert_eq!(store.get_all_contracts("other").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_methods_is_noop() {
        let store = store();
        store.insert_methods("reviews", "a.b.Review", &[]).unwrap();
        assert!(store.get_contract("reviews", "a.b.Review").unwrap().is_empty());
    }
}
