use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// One input row. Field order is the order of the source columns and is
/// preserved when the record is written back out as part of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new(fields: Vec<Field>) -> Self {
        Record { fields }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, value)| Field {
                name: name.into(),
                value: value.into(),
            })
            .collect();
        Record { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value of the configured identifier field. Empty values are rejected
    /// because the identifier keys every checkpoint written for the record.
    pub fn id(&self, index_name: &str) -> Result<&str, ModelError> {
        match self.get(index_name) {
            None => Err(ModelError::MissingIdentifier {
                field: index_name.to_string(),
            }),
            Some(v) if v.trim().is_empty() => Err(ModelError::EmptyIdentifier {
                field: index_name.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), Value::String(f.value.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_requires_present_non_empty_field() {
        let rec = Record::from_pairs([("email", "a@x.io"), ("name", "A")]);
        assert_eq!(rec.id("email").unwrap(), "a@x.io");
        assert_eq!(
            rec.id("user_id"),
            Err(ModelError::MissingIdentifier {
                field: "user_id".into()
            })
        );

        let blank = Record::from_pairs([("email", "  ")]);
        assert!(matches!(
            blank.id("email"),
            Err(ModelError::EmptyIdentifier { .. })
        ));
    }

    #[test]
    fn keeps_source_field_order() {
        let rec = Record::from_pairs([("z", "1"), ("a", "2")]);
        assert_eq!(rec.field_names().collect::<Vec<_>>(), vec!["z", "a"]);
    }
}
