use charadex_core::{Character, CharacterDraft};

#[test]
fn character_serialization_uses_expected_wire_fields() {
    let character = Character {
        id: 7,
        name: "Mario".to_string(),
        description: "Plumber from the Mushroom Kingdom".to_string(),
        appearance_date: "13/07/1985".to_string(),
        info_url: "es.wikipedia.org/wiki/Mario".to_string(),
        image: None,
        category: "games".to_string(),
    };

    let json = serde_json::to_value(&character).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["name"], "Mario");
    assert_eq!(json["description"], "Plumber from the Mushroom Kingdom");
    assert_eq!(json["appearance_date"], "13/07/1985");
    assert_eq!(json["info_url"], "es.wikipedia.org/wiki/Mario");
    assert_eq!(json["image"], serde_json::Value::Null);
    assert_eq!(json["category"], "games");

    let decoded: Character = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, character);
}

#[test]
fn info_link_re_adds_the_https_scheme() {
    let character = Character {
        id: 1,
        name: "Mario".to_string(),
        description: String::new(),
        appearance_date: "1981".to_string(),
        info_url: "es.wikipedia.org/wiki/Mario".to_string(),
        image: None,
        category: "games".to_string(),
    };

    assert_eq!(character.info_link(), "https://es.wikipedia.org/wiki/Mario");
}

#[test]
fn draft_default_is_empty_with_no_image() {
    let draft = CharacterDraft::default();

    assert!(draft.name.is_empty());
    assert!(draft.description.is_empty());
    assert!(draft.appearance_date.is_empty());
    assert!(draft.info_url.is_empty());
    assert!(draft.image.is_none());
    assert!(draft.category.is_empty());
}
