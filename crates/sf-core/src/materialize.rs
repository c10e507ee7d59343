//! JSON payloads: creating entity subtrees from them and exporting templates.
//!
//! Payload shape: `{"type": "<kind>", "id"?: "...", "<property>": ...}`.
//! Text properties are strings, owned children are nested payloads, and
//! reference lists are arrays of existing ids.

use crate::error::{FigureError, FigureResult};
use crate::id::EntityId;
use crate::model::{Entity, FigureDocument, IdList, Value};
use crate::schema::{EntityKind, Property, PropertyType};
use crate::transaction::Transaction;
use serde_json::{Map, Value as Json};

impl Transaction<'_> {
    /// Create an entity and all of its nested children from a payload.
    ///
    /// Children are created before their parent so the parent can take
    /// ownership of them. Missing ids are generated; a supplied id must be
    /// unused.
    pub fn create_from_json(&mut self, payload: &Json) -> FigureResult<EntityId> {
        let obj = payload
            .as_object()
            .ok_or_else(|| malformed(format!("expected an object, got {payload}")))?;
        let tag = obj
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| malformed("payload has no `type`"))?;
        let kind = EntityKind::parse(tag)
            .filter(|kind| *kind != EntityKind::Document)
            .ok_or_else(|| malformed(format!("unknown entity type `{tag}`")))?;
        let id = match obj.get("id") {
            None | Some(Json::Null) => self.document().fresh_id(kind),
            Some(Json::String(s)) if !s.is_empty() => EntityId::intern(s),
            Some(other) => return Err(malformed(format!("invalid id {other}"))),
        };
        if self.document().contains(id) {
            return Err(malformed(format!("duplicate id `{id}`")));
        }

        let mut entity = Entity::new(id, kind);
        for (key, raw) in obj {
            if key == "type" || key == "id" {
                continue;
            }
            let spec = Property::parse(key)
                .and_then(|property| kind.spec(property))
                .ok_or_else(|| malformed(format!("{kind} has no property `{key}`")))?;
            let value = match spec.ty {
                PropertyType::Text => match raw {
                    Json::Null => continue,
                    Json::String(s) => Value::Text(s.clone()),
                    other => {
                        return Err(malformed(format!(
                            "{kind}.{key} must be a string, got {other}"
                        )));
                    }
                },
                PropertyType::Child(_) => Value::Id(self.create_from_json(raw)?),
                PropertyType::Children(_) => {
                    let mut ids = IdList::new();
                    for item in array(kind, key, raw)? {
                        ids.push(self.create_from_json(item)?);
                    }
                    Value::List(ids)
                }
                PropertyType::References(_) => {
                    let mut ids = IdList::new();
                    for item in array(kind, key, raw)? {
                        let target = item.as_str().ok_or_else(|| {
                            malformed(format!("{kind}.{key} must list ids, got {item}"))
                        })?;
                        ids.push(EntityId::intern(target));
                    }
                    Value::List(ids)
                }
            };
            entity = entity.with_value(spec.property, value);
        }
        self.create(entity)
    }
}

impl FigureDocument {
    /// Payload for `id` and its owned subtree, without ids.
    ///
    /// Feeding the result to [`Transaction::create_from_json`] produces a
    /// fresh copy with new ids. References are kept as ids.
    pub fn template_of(&self, id: EntityId) -> FigureResult<Json> {
        self.export(id, false)
    }

    /// Payload for `id` and its owned subtree, ids included.
    pub fn to_json(&self, id: EntityId) -> FigureResult<Json> {
        self.export(id, true)
    }

    fn export(&self, id: EntityId, with_ids: bool) -> FigureResult<Json> {
        let entity = self.entity(id)?;
        let mut obj = Map::new();
        obj.insert("type".into(), Json::from(entity.kind.as_str()));
        if with_ids {
            obj.insert("id".into(), Json::from(id.as_str()));
        }
        for spec in entity.kind.schema() {
            let key = spec.property.as_str().to_string();
            match (spec.ty, entity.get(spec.property)) {
                (PropertyType::Text, Some(Value::Text(s))) => {
                    obj.insert(key, Json::from(s.as_str()));
                }
                (PropertyType::Child(_), Some(Value::Id(child))) => {
                    obj.insert(key, self.export(*child, with_ids)?);
                }
                (PropertyType::Children(_), Some(Value::List(ids))) => {
                    let items = ids
                        .iter()
                        .map(|child| self.export(*child, with_ids))
                        .collect::<FigureResult<Vec<_>>>()?;
                    obj.insert(key, Json::Array(items));
                }
                (PropertyType::References(_), Some(Value::List(ids))) => {
                    obj.insert(
                        key,
                        Json::Array(ids.iter().map(|r| Json::from(r.as_str())).collect()),
                    );
                }
                _ => {}
            }
        }
        Ok(Json::Object(obj))
    }
}

fn array<'j>(kind: EntityKind, key: &str, raw: &'j Json) -> FigureResult<&'j Vec<Json>> {
    raw.as_array()
        .ok_or_else(|| malformed(format!("{kind}.{key} must be an array, got {raw}")))
}

fn malformed(message: impl Into<String>) -> FigureError {
    FigureError::MalformedPayload(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::ListPath;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn panel_payload() -> Json {
        json!({
            "type": "panel",
            "title": "Figure 1",
            "image": { "type": "image", "src": "1-a.png", "mimeType": "image/png" },
            "legend": [{ "type": "paragraph", "content": "Scale bar 10 µm" }],
            "keywords": [{
                "type": "keyword-group",
                "name": "Organism",
                "keywords": [{ "type": "keyword", "content": "mouse" }]
            }]
        })
    }

    #[test]
    fn creates_nested_subtree_with_ownership() {
        let mut doc = FigureDocument::new();
        let panel = doc.transaction(|tx| tx.create_from_json(&panel_payload())).unwrap();

        let entity = doc.entity(panel).unwrap();
        assert_eq!(entity.kind, EntityKind::Panel);
        let image = entity.child(Property::Image).unwrap();
        assert_eq!(doc.parent_of(image), Some((panel, Property::Image)));
        let legend = entity.list(Property::Legend);
        assert_eq!(legend.len(), 1);
        assert_eq!(
            doc.entity(legend[0]).unwrap().text(Property::Content),
            Some("Scale bar 10 µm")
        );
        // panel + image + paragraph + group + keyword
        assert_eq!(doc.entity_count(), 6);
    }

    #[test]
    fn failure_deep_in_payload_leaves_nothing_behind() {
        let mut doc = FigureDocument::new();
        let mut payload = panel_payload();
        payload["keywords"][0]["keywords"][0]["type"] = json!("bogus");
        let err = doc.transaction(|tx| tx.create_from_json(&payload)).unwrap_err();
        assert!(matches!(err, FigureError::MalformedPayload(_)));
        assert_eq!(doc.entity_count(), 1);
    }

    #[test]
    fn rejects_unknown_property_and_duplicate_id() {
        let mut doc = FigureDocument::new();
        let err = doc
            .transaction(|tx| tx.create_from_json(&json!({"type": "keyword", "colour": "red"})))
            .unwrap_err();
        assert!(matches!(err, FigureError::MalformedPayload(_)));

        doc.transaction(|tx| tx.create_from_json(&json!({"type": "keyword", "id": "kw_dup"})))
            .unwrap();
        let err = doc
            .transaction(|tx| tx.create_from_json(&json!({"type": "keyword", "id": "kw_dup"})))
            .unwrap_err();
        assert!(matches!(err, FigureError::MalformedPayload(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn panel_without_image_is_malformed() {
        let mut doc = FigureDocument::new();
        let err = doc
            .transaction(|tx| tx.create_from_json(&json!({"type": "panel", "title": "x"})))
            .unwrap_err();
        assert!(matches!(err, FigureError::MalformedPayload(_)));
    }

    #[test]
    fn references_must_exist() {
        let mut doc = FigureDocument::new();
        let payload = json!({
            "type": "panel",
            "image": { "type": "image" },
            "files": ["file_missing"]
        });
        let err = doc.transaction(|tx| tx.create_from_json(&payload)).unwrap_err();
        assert!(matches!(err, FigureError::MalformedPayload(_)));
    }

    #[test]
    fn template_copies_content_without_ids() {
        let mut doc = FigureDocument::new();
        let panel = doc.transaction(|tx| tx.create_from_json(&panel_payload())).unwrap();
        let template = doc.template_of(panel).unwrap();
        let mut expected = panel_payload();
        expected["files"] = json!([]);
        expected["resources"] = json!([]);
        assert_eq!(template, expected);

        let panels = ListPath::new(doc.root_id(), Property::Panels);
        let copy = doc
            .transaction(|tx| {
                let copy = tx.create_from_json(&template)?;
                tx.append(&panels, copy)?;
                Ok(copy)
            })
            .unwrap();
        assert_ne!(copy, panel);
        assert_eq!(doc.template_of(copy).unwrap(), template);
    }

    #[test]
    fn to_json_includes_ids() {
        let mut doc = FigureDocument::new();
        let id = doc
            .transaction(|tx| tx.create_from_json(&json!({"type": "keyword", "content": "rat"})))
            .unwrap();
        let exported = doc.to_json(id).unwrap();
        assert_eq!(exported["id"], json!(id.as_str()));
        assert_eq!(exported["content"], json!("rat"));
    }
}
