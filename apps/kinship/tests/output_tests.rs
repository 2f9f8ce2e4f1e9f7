//! Tests for JSON responses and text renderings.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use kinship::output::{
    MutationResponse, SearchHit, StatusResponse, render_ancestors, render_descendants,
    render_detail, render_family, render_search,
};
use kinship_core::{
    Event, FamilyDetails, Genealogy, IndividualId, PersonDetails, Sex,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn person(first: &str, last: &str, sex: Sex, born: &str) -> PersonDetails {
    PersonDetails {
        first_name: first.to_string(),
        last_name: last.to_string(),
        sex,
        birth: Event::new(born, ""),
        ..PersonDetails::default()
    }
}

/// John and Mary Smith, married 1875 in Leeds, with one son Tom.
fn smith_family() -> (Genealogy, IndividualId, IndividualId, IndividualId) {
    let mut g = Genealogy::new();
    let john = g.add_individual(person("John", "Smith", Sex::Male, "1850")).unwrap();
    let mary = g.add_individual(person("Mary", "Jones", Sex::Female, "1852")).unwrap();
    let tom = g.add_individual(person("Tom", "Smith", Sex::Male, "1877")).unwrap();
    let family = g
        .create_family(
            FamilyDetails {
                married: Event::new("1875", "Leeds"),
                note: String::new(),
            },
            &[john, mary],
        )
        .unwrap();
    g.set_child_in_family(tom, family).unwrap();
    (g, john, mary, tom)
}

// =============================================================================
// JSON RESPONSES
// =============================================================================

#[test]
fn test_mutation_response_with_id() {
    let response = MutationResponse::ok(IndividualId(3), "Added Smith, John");
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["id"], "I3");
    assert_eq!(json["message"], "Added Smith, John");
}

#[test]
fn test_mutation_response_without_id() {
    let response = MutationResponse::done("Recomputed 2 family names");
    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"id\":null"));

    let back: MutationResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn test_status_response_fields() {
    let status = StatusResponse {
        database: "kinship.db".to_string(),
        backend: "redb".to_string(),
        persistent: true,
        individuals: 3,
        families: 1,
        index_tokens: 4,
    };
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["backend"], "redb");
    assert_eq!(json["individuals"], 3);
    assert_eq!(json["index_tokens"], 4);
}

#[test]
fn test_search_hit_from_family() {
    let (g, john, mary, _) = smith_family();
    let families = g.search("smith").unwrap();
    assert_eq!(families.len(), 1);

    let hit = SearchHit::from(&families[0]);
    assert_eq!(hit.id, "F0");
    assert_eq!(hit.name, families[0].name);
    assert_eq!(hit.partners, vec![john.to_string(), mary.to_string()]);
}

// =============================================================================
// TEXT RENDERING
// =============================================================================

#[test]
fn test_render_search_empty() {
    assert_eq!(render_search(&[]), "No families found\n");
}

#[test]
fn test_render_search_lines() {
    let hits = vec![SearchHit {
        id: "F1".to_string(),
        name: "Smith, John & Jones, Mary".to_string(),
        partners: vec!["I1".to_string(), "I2".to_string()],
    }];
    assert_eq!(render_search(&hits), "Smith, John & Jones, Mary [F1]\n");
}

#[test]
fn test_render_descendants_indents_and_lists_spouse() {
    let (g, john, _, _) = smith_family();
    let text = render_descendants(&g.descendants(john).unwrap());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "Smith, John (1850-?) [I0]");
    assert_eq!(lines[1], "  + Jones, Mary (1852-?) [I1] m. 1875, Leeds");
    assert_eq!(lines[2], "    Smith, Tom (1877-?) [I2]");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_render_ancestors_indents_parents() {
    let (g, _, _, tom) = smith_family();
    let text = render_ancestors(&g.ancestors(tom).unwrap());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "Smith, Tom (1877-?) [I2]");
    assert_eq!(lines.len(), 3);
    assert!(lines[1..].iter().all(|l| l.starts_with("    ")));
    assert!(text.contains("Smith, John (1850-?) [I0]"));
    assert!(text.contains("Jones, Mary (1852-?) [I1]"));
}

#[test]
fn test_render_detail_page() {
    let (g, john, _, _) = smith_family();
    let text = render_detail(&g.individual_detail(john).unwrap());

    assert!(text.starts_with("Smith, John (1850-?) [I0]\n"));
    assert!(text.contains("Sex: M\n"));
    assert!(text.contains("Born: 1850\n"));
    assert!(text.contains("  Married: 1875, Leeds\n"));
    assert!(text.contains("  Spouse: Jones, Mary (1852-?) [I1]\n"));
    assert!(text.contains("  Child: Smith, Tom (1877-?) [I2]\n"));
    assert!(!text.contains("Parents:"));
}

#[test]
fn test_render_detail_lists_parents() {
    let (g, _, _, tom) = smith_family();
    let text = render_detail(&g.individual_detail(tom).unwrap());
    assert!(text.contains("Parents:\n"));
    assert!(text.contains("  Smith, John (1850-?) [I0]\n"));
}

#[test]
fn test_render_family_page() {
    let (g, john, mary, tom) = smith_family();
    let family = g.families_of(john).unwrap().remove(0);
    let partners = vec![g.individual(john).unwrap(), g.individual(mary).unwrap()];
    let children = vec![g.individual(tom).unwrap()];

    let text = render_family(&family, &partners, &children);
    assert!(text.starts_with(&format!("{} [F0]\n", family.name)));
    assert!(text.contains("Married: 1875, Leeds\n"));
    assert!(text.contains("Partner: Smith, John (1850-?) [I0]\n"));
    assert!(text.contains("Child: Smith, Tom (1877-?) [I2]\n"));
}

#[test]
fn test_render_marks_people_reached_twice() {
    // Cousins marry: their son is reached from the grandfather through both.
    let mut g = Genealogy::new();
    let root = g.add_individual(person("Root", "Hall", Sex::Male, "1800")).unwrap();
    let a = g.add_individual(person("Ann", "Hall", Sex::Female, "1830")).unwrap();
    let b = g.add_individual(person("Ben", "Hall", Sex::Male, "1832")).unwrap();
    let kid = g.add_individual(person("Cal", "Hall", Sex::Male, "1860")).unwrap();
    let top = g.create_family(FamilyDetails::default(), &[root]).unwrap();
    g.set_child_in_family(a, top).unwrap();
    g.set_child_in_family(b, top).unwrap();
    let couple = g.create_family(FamilyDetails::default(), &[a, b]).unwrap();
    g.set_child_in_family(kid, couple).unwrap();

    let down = render_descendants(&g.descendants(root).unwrap());
    let cal: Vec<&str> = down.lines().filter(|l| l.contains("Hall, Cal")).collect();
    assert_eq!(cal.len(), 2);
    assert!(!cal[0].ends_with("(see above)"));
    assert!(cal[1].ends_with("(see above)"));

    let up = render_ancestors(&g.ancestors(kid).unwrap());
    let root_lines: Vec<&str> = up.lines().filter(|l| l.contains("Hall, Root")).collect();
    assert_eq!(root_lines.len(), 2);
    assert!(root_lines[1].ends_with("(see above)"));
}
