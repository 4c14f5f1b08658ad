use mongodb::bson::{self, oid::ObjectId};
use todo_api::{
    models::{DeletedResponse, Todo, UpdatedResponse},
    repository::TodoDocument,
};

#[test]
fn test_create_body_without_id_or_userid_deserializes() {
    let todo: Todo = serde_json::from_str(r#"{"title":"buy milk"}"#).unwrap();

    assert_eq!(todo.title, "buy milk");
    assert!(todo.id.is_empty());
    assert!(todo.userid.is_empty());
    assert!(!todo.completed);
}

#[test]
fn test_empty_body_deserializes_with_defaults() {
    let todo: Todo = serde_json::from_str("{}").unwrap();
    assert_eq!(todo, Todo::default());
}

#[test]
fn test_body_with_wrong_field_type_is_rejected() {
    assert!(serde_json::from_str::<Todo>(r#"{"title":["a"]}"#).is_err());
    assert!(serde_json::from_str::<Todo>(r#"{"title":"x","completed":"no"}"#).is_err());
}

#[test]
fn test_count_fields_use_camel_case() {
    let updated = UpdatedResponse {
        success: "Todo updated successfully".to_string(),
        matched_count: 1,
        modified_count: 0,
    };
    let json = serde_json::to_value(&updated).unwrap();
    assert_eq!(json["matchedCount"], 1);
    assert_eq!(json["modifiedCount"], 0);

    let deleted = DeletedResponse {
        success: "All todos deleted".to_string(),
        deleted_count: 3,
    };
    let json = serde_json::to_string(&deleted).unwrap();
    assert!(json.contains(r#""deletedCount":3"#));
    assert!(!json.contains("deleted_count"));
}

#[test]
fn test_document_stores_id_as_object_id_under_underscore_id() {
    let id = ObjectId::new();
    let document = TodoDocument {
        id,
        userid: "u1".to_string(),
        title: "buy milk".to_string(),
        completed: false,
    };

    let stored = bson::to_document(&document).unwrap();

    assert_eq!(stored.get_object_id("_id").unwrap(), id);
    assert!(!stored.contains_key("id"));
    assert_eq!(stored.get_str("userid").unwrap(), "u1");
}

#[test]
fn test_document_without_completed_field_decodes() {
    let id = ObjectId::new();
    let raw = bson::doc! { "_id": id, "userid": "u1", "title": "legacy" };

    let document: TodoDocument = bson::from_document(raw).unwrap();

    assert_eq!(document.id, id);
    assert!(!document.completed);
}

#[test]
fn test_api_todo_round_trips_through_document() {
    let id = ObjectId::new();
    let todo = Todo {
        id: id.to_hex(),
        userid: "u1".to_string(),
        title: "buy milk".to_string(),
        completed: true,
    };

    let document = TodoDocument::try_from(todo.clone()).unwrap();
    assert_eq!(document.id, id);
    assert_eq!(Todo::from(document), todo);
}

#[test]
fn test_api_todo_with_malformed_id_does_not_convert() {
    let todo = Todo {
        id: "not-an-object-id".to_string(),
        userid: "u1".to_string(),
        title: "x".to_string(),
        completed: false,
    };

    assert!(TodoDocument::try_from(todo).is_err());
}
