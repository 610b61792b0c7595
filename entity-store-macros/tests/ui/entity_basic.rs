use entity_store::entity::Entity;
use entity_store_macros::entity;

#[entity]
struct Invoice {
    amount: i64,
}

fn main() {
    let invoice = Invoice {
        id: "A1".to_string(),
        amount: 10,
    };
    assert_eq!(invoice.id(), "A1");
    assert_eq!(Invoice::TYPE, "Invoice");
    assert!(Invoice::BACKUP);

    // 默认派生 Debug/Clone/Serialize/Deserialize
    let _ = format!("{:?}", invoice.clone());
    let json = serde_json::to_string(&invoice).unwrap();
    assert!(json.starts_with(r#"{"id":"A1""#));
    let back: Invoice = serde_json::from_str(&json).unwrap();
    assert_eq!(back.amount, 10);
}
