use entity_store::entity::Entity;
use entity_store_macros::entity;

#[entity(type_name = "Customer")]
struct Customer {
    name: String,
    id: String,
}

fn main() {
    let c = Customer {
        name: "ACME".into(),
        id: "C1".into(),
    };
    assert_eq!(c.id(), "C1");
    assert_eq!(c.name, "ACME");
}
