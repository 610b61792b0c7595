use entity_store::entity::Entity;
use entity_store_macros::entity;
use serde::{Deserialize, Serialize};

#[entity(type_name = "Scratch", backup = false)]
#[derive(PartialEq, Serialize, Deserialize)]
struct ScratchPad {
    body: String,
}

#[entity(debug = false)]
struct Secret {
    token: String,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({})", self.id)
    }
}

fn main() {
    assert_eq!(ScratchPad::TYPE, "Scratch");
    assert!(!ScratchPad::BACKUP);
    let pad = ScratchPad {
        id: "p1".into(),
        body: String::new(),
    };
    assert!(pad == pad.clone());

    let secret = Secret {
        id: "s1".into(),
        token: "hunter2".into(),
    };
    assert_eq!(format!("{secret:?}"), "Secret(s1)");
    assert_eq!(secret.token.len(), 7);
}
