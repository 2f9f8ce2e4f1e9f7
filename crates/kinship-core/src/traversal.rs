//! # Lineage Traversal
//!
//! Depth-first ancestor and descendant walks that flatten a lineage into an
//! ordered list for rendering.
//!
//! All walks are computationally bounded. A walk that goes deeper than
//! `MAX_TRAVERSAL_DEPTH` generations, or that meets an individual already on
//! its own path, is malformed data and fails instead of looping. Someone
//! reachable by more than one route (pedigree collapse) is expanded once and
//! then listed as a `repeat`, so a walk is linear in the size of the lineage.
//! Walk state is local to each call, so independent walks can run
//! concurrently.

use crate::primitives::MAX_TRAVERSAL_DEPTH;
use crate::relations::{family_children, family_partners, parents, require_individual};
use crate::store::RecordStore;
use crate::{Event, Family, FamilyId, Individual, IndividualId, KinshipError};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Condensed view of one family from a partner's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyView {
    pub family: FamilyId,
    /// Cached display name of the family.
    pub name: String,
    pub married: Event,
    /// Partners other than the viewing individual, in storage order.
    pub spouses: Vec<Individual>,
    /// Children ordered by birth.
    pub children: Vec<Individual>,
}

/// One row of a descendant walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescendantEntry {
    /// 0 for the starting individual, 1 for children, and so on.
    pub generation: usize,
    pub individual: Individual,
    /// Every family the individual is a partner in. Empty for a repeat.
    pub families: Vec<FamilyView>,
    /// Already listed earlier in this walk; not expanded again.
    pub repeat: bool,
}

/// One row of an ancestor walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorEntry {
    /// 0 for the starting individual, 1 for parents, and so on.
    pub generation: usize,
    pub individual: Individual,
    /// Empty for a repeat.
    pub parents: Vec<Individual>,
    /// Already listed earlier in this walk; not expanded again.
    pub repeat: bool,
}

/// Build the partner-side view of a family.
pub fn family_view<S: RecordStore + ?Sized>(
    store: &S,
    family: &Family,
    viewer: IndividualId,
) -> Result<FamilyView, KinshipError> {
    let spouses = family_partners(store, family)?
        .into_iter()
        .filter(|p| p.id != viewer)
        .collect();
    Ok(FamilyView {
        family: family.id,
        name: family.name.clone(),
        married: family.details.married.clone(),
        spouses,
        children: family_children(store, family.id)?,
    })
}

/// Views of every family the individual is a partner in, in storage order.
pub fn family_views<S: RecordStore + ?Sized>(
    store: &S,
    individual: IndividualId,
) -> Result<Vec<FamilyView>, KinshipError> {
    store
        .families_with_partner(individual)?
        .into_iter()
        .map(|id| {
            let family = store.family(id)?.ok_or(KinshipError::FamilyNotFound(id))?;
            family_view(store, &family, individual)
        })
        .collect()
}

// =============================================================================
// WALKS
// =============================================================================

/// Per-walk state: who is on the current path, and who has been listed.
///
/// An individual reached a second time by another route (cousins who marry,
/// siblings who share descendants) gets a `repeat` entry and is not expanded
/// again, so a walk visits each relationship edge once.
struct Walk<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    start: IndividualId,
    path: BTreeSet<IndividualId>,
    listed: BTreeSet<IndividualId>,
}

/// What to do with an individual reached by the walk.
enum Visit {
    /// First time seen: list and expand.
    Expand,
    /// Already listed via another route.
    Repeat,
}

impl<'a, S: RecordStore + ?Sized> Walk<'a, S> {
    fn new(store: &'a S, start: IndividualId) -> Self {
        Self {
            store,
            start,
            path: BTreeSet::new(),
            listed: BTreeSet::new(),
        }
    }

    fn enter(
        &mut self,
        id: IndividualId,
        generation: usize,
        direction: &str,
    ) -> Result<Visit, KinshipError> {
        if generation > MAX_TRAVERSAL_DEPTH {
            return Err(KinshipError::TraversalDepthExceeded {
                start: self.start,
                limit: MAX_TRAVERSAL_DEPTH,
            });
        }
        if self.path.contains(&id) {
            tracing::warn!(start = %self.start, at = %id, direction, "cycle in lineage walk");
            return Err(KinshipError::CyclicRelationship(id));
        }
        if !self.listed.insert(id) {
            return Ok(Visit::Repeat);
        }
        self.path.insert(id);
        Ok(Visit::Expand)
    }

    fn leave(&mut self, id: IndividualId) {
        self.path.remove(&id);
    }

    fn down(
        &mut self,
        individual: Individual,
        generation: usize,
        out: &mut Vec<DescendantEntry>,
    ) -> Result<(), KinshipError> {
        let id = individual.id;
        if let Visit::Repeat = self.enter(id, generation, "descendants")? {
            out.push(DescendantEntry {
                generation,
                individual,
                families: Vec::new(),
                repeat: true,
            });
            return Ok(());
        }

        let families = family_views(self.store, id)?;
        let next: Vec<Individual> = families
            .iter()
            .flat_map(|view| view.children.iter().cloned())
            .collect();
        out.push(DescendantEntry {
            generation,
            individual,
            families,
            repeat: false,
        });

        for child in next {
            self.down(child, generation.saturating_add(1), out)?;
        }

        self.leave(id);
        Ok(())
    }

    fn up(
        &mut self,
        individual: Individual,
        generation: usize,
        out: &mut Vec<AncestorEntry>,
    ) -> Result<(), KinshipError> {
        let id = individual.id;
        if let Visit::Repeat = self.enter(id, generation, "ancestors")? {
            out.push(AncestorEntry {
                generation,
                individual,
                parents: Vec::new(),
                repeat: true,
            });
            return Ok(());
        }

        let parents = parents(self.store, id)?;
        let next = parents.clone();
        out.push(AncestorEntry {
            generation,
            individual,
            parents,
            repeat: false,
        });

        for parent in next {
            self.up(parent, generation.saturating_add(1), out)?;
        }

        self.leave(id);
        Ok(())
    }
}

/// Pre-order walk down through children.
///
/// Visits the individual, then for each of their families in storage order,
/// each child in birth order. Someone reachable by two routes is expanded
/// the first time and listed as a repeat after that.
pub fn descendants<S: RecordStore + ?Sized>(
    store: &S,
    start: IndividualId,
) -> Result<Vec<DescendantEntry>, KinshipError> {
    let root = require_individual(store, start)?;
    let mut out = Vec::new();
    Walk::new(store, start).down(root, 0, &mut out)?;
    Ok(out)
}

/// Pre-order walk up through parents.
///
/// Visits the individual, then each parent (male, female, unknown order)
/// and their ancestors. Shared ancestors are expanded once.
pub fn ancestors<S: RecordStore + ?Sized>(
    store: &S,
    start: IndividualId,
) -> Result<Vec<AncestorEntry>, KinshipError> {
    let root = require_individual(store, start)?;
    let mut out = Vec::new();
    Walk::new(store, start).up(root, 0, &mut out)?;
    Ok(out)
}

/// True if `candidate` is `of` or one of its ancestors.
///
/// Breadth-first with a visited set. Fails with `TraversalDepthExceeded`
/// when the lineage above `of` is deeper than `MAX_TRAVERSAL_DEPTH`, so a
/// cycle longer than the ceiling is never reported as "not an ancestor".
pub fn is_ancestor_or_self<S: RecordStore + ?Sized>(
    store: &S,
    candidate: IndividualId,
    of: IndividualId,
) -> Result<bool, KinshipError> {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((of, 0usize));
    visited.insert(of);

    while let Some((current, depth)) = queue.pop_front() {
        if current == candidate {
            return Ok(true);
        }
        let Some(ind) = store.individual(current)? else {
            continue;
        };
        let Some(family) = ind.child_in_family else {
            continue;
        };
        let Some(family) = store.family(family)? else {
            continue;
        };
        if depth >= MAX_TRAVERSAL_DEPTH && !family.partners.is_empty() {
            tracing::warn!(start = %of, limit = MAX_TRAVERSAL_DEPTH, "ancestor check hit depth ceiling");
            return Err(KinshipError::TraversalDepthExceeded {
                start: of,
                limit: MAX_TRAVERSAL_DEPTH,
            });
        }
        for parent in family.partners {
            if visited.insert(parent) {
                queue.push_back((parent, depth.saturating_add(1)));
            }
        }
    }
    Ok(false)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, WriteBatch};
    use crate::{FamilyDetails, PersonDetails, Sex};

    fn person(store: &mut MemoryStore, name: &str, sex: Sex, born: &str) -> IndividualId {
        store
            .insert_individual(PersonDetails::named(name, "Test", sex).born(born))
            .expect("insert")
    }

    fn family(
        store: &mut MemoryStore,
        partners: &[IndividualId],
        children: &[IndividualId],
    ) -> FamilyId {
        let id = store.insert_family(FamilyDetails::default()).expect("insert");
        let mut fam = store.family(id).expect("get").expect("exists");
        fam.partners = partners.to_vec();
        let mut batch = WriteBatch::new();
        batch.put_family(fam);
        for child in children {
            let mut ind = store.individual(*child).expect("get").expect("exists");
            ind.child_in_family = Some(id);
            batch.put_individual(ind);
        }
        store.apply(batch).expect("apply");
        id
    }

    fn walk_ids(entries: &[DescendantEntry]) -> Vec<(usize, IndividualId)> {
        entries
            .iter()
            .map(|e| (e.generation, e.individual.id))
            .collect()
    }

    #[test]
    fn descendants_pre_order() {
        let mut store = MemoryStore::new();
        let gp = person(&mut store, "Grandpa", Sex::Male, "1850");
        let gm = person(&mut store, "Grandma", Sex::Female, "1852");
        let son = person(&mut store, "Son", Sex::Male, "1880");
        let daughter = person(&mut store, "Daughter", Sex::Female, "1875");
        let wife = person(&mut store, "Wife", Sex::Female, "1882");
        let grandkid = person(&mut store, "Grandkid", Sex::Male, "1905");
        family(&mut store, &[gp, gm], &[son, daughter]);
        family(&mut store, &[son, wife], &[grandkid]);

        let entries = descendants(&store, gp).expect("walk");
        assert_eq!(
            walk_ids(&entries),
            vec![(0, gp), (1, daughter), (1, son), (2, grandkid)]
        );
        assert_eq!(entries[0].families.len(), 1);
        assert_eq!(entries[0].families[0].spouses[0].id, gm);
        assert!(entries[1].families.is_empty());
    }

    #[test]
    fn ancestors_follow_parents() {
        let mut store = MemoryStore::new();
        let gp = person(&mut store, "Grandpa", Sex::Male, "");
        let gm = person(&mut store, "Grandma", Sex::Female, "");
        let mum = person(&mut store, "Mum", Sex::Female, "");
        let dad = person(&mut store, "Dad", Sex::Male, "");
        let kid = person(&mut store, "Kid", Sex::Unknown, "");
        family(&mut store, &[gm, gp], &[mum]);
        family(&mut store, &[mum, dad], &[kid]);

        let ids: Vec<_> = ancestors(&store, kid)
            .expect("walk")
            .iter()
            .map(|e| (e.generation, e.individual.id))
            .collect();
        assert_eq!(ids, vec![(0, kid), (1, dad), (1, mum), (2, gp), (2, gm)]);
    }

    #[test]
    fn self_parent_cycle_fails_fast() {
        let mut store = MemoryStore::new();
        let a = person(&mut store, "Loop", Sex::Male, "");
        family(&mut store, &[a], &[a]);

        assert!(matches!(
            descendants(&store, a),
            Err(KinshipError::CyclicRelationship(id)) if id == a
        ));
        assert!(matches!(
            ancestors(&store, a),
            Err(KinshipError::CyclicRelationship(id)) if id == a
        ));
    }

    #[test]
    fn shared_descendant_is_listed_once_then_as_repeat() {
        // Cousins marrying: their child is reached from the common ancestor
        // through each parent.
        let mut store = MemoryStore::new();
        let root = person(&mut store, "Root", Sex::Male, "");
        let a = person(&mut store, "A", Sex::Male, "1");
        let b = person(&mut store, "B", Sex::Female, "2");
        family(&mut store, &[root], &[a, b]);
        let kid = person(&mut store, "Kid", Sex::Male, "");
        family(&mut store, &[a, b], &[kid]);

        let entries = descendants(&store, root).expect("walk");
        let kids: Vec<&DescendantEntry> =
            entries.iter().filter(|e| e.individual.id == kid).collect();
        assert_eq!(kids.len(), 2);
        assert!(!kids[0].repeat);
        assert!(kids[1].repeat);
        assert!(kids[1].families.is_empty());
    }

    /// Each generation's two siblings are the partners of the next family.
    fn sibling_marriages(
        store: &mut MemoryStore,
        generations: usize,
    ) -> (IndividualId, IndividualId) {
        let founder_a = person(store, "A0", Sex::Male, "");
        let founder_b = person(store, "B0", Sex::Female, "");
        let (mut a, mut b) = (founder_a, founder_b);
        for n in 1..=generations {
            let next_a = person(store, &format!("A{n}"), Sex::Male, "");
            let next_b = person(store, &format!("B{n}"), Sex::Female, "");
            family(store, &[a, b], &[next_a, next_b]);
            a = next_a;
            b = next_b;
        }
        (founder_a, a)
    }

    #[test]
    fn pedigree_collapse_stays_linear() {
        let generations = 40;
        let mut store = MemoryStore::new();
        let (founder, last) = sibling_marriages(&mut store, generations);

        let down = descendants(&store, founder).expect("walk");
        assert!(down.len() <= 4 * generations + 2, "{} entries", down.len());
        let expanded = down.iter().filter(|e| !e.repeat).count();
        assert_eq!(expanded, 2 * generations + 1);

        let up = ancestors(&store, last).expect("walk");
        assert!(up.len() <= 4 * generations + 2, "{} entries", up.len());
        let expanded = up.iter().filter(|e| !e.repeat).count();
        assert_eq!(expanded, 2 * generations + 1);
    }

    #[test]
    fn missing_start_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            descendants(&store, IndividualId(1)),
            Err(KinshipError::IndividualNotFound(_))
        ));
        assert!(matches!(
            ancestors(&store, IndividualId(1)),
            Err(KinshipError::IndividualNotFound(_))
        ));
    }

    #[test]
    fn ancestor_check() {
        let mut store = MemoryStore::new();
        let gp = person(&mut store, "Grandpa", Sex::Male, "");
        let dad = person(&mut store, "Dad", Sex::Male, "");
        let kid = person(&mut store, "Kid", Sex::Male, "");
        family(&mut store, &[gp], &[dad]);
        family(&mut store, &[dad], &[kid]);

        assert!(is_ancestor_or_self(&store, gp, kid).expect("check"));
        assert!(is_ancestor_or_self(&store, kid, kid).expect("check"));
        assert!(!is_ancestor_or_self(&store, kid, gp).expect("check"));
    }

    #[test]
    fn ancestor_check_fails_past_depth_ceiling() {
        let mut store = MemoryStore::new();
        let top = person(&mut store, "Top", Sex::Male, "");
        let mut bottom = top;
        for n in 0..MAX_TRAVERSAL_DEPTH + 5 {
            let next = person(&mut store, &format!("G{n}"), Sex::Male, "");
            family(&mut store, &[bottom], &[next]);
            bottom = next;
        }
        let stranger = person(&mut store, "Stranger", Sex::Male, "");

        assert!(matches!(
            is_ancestor_or_self(&store, stranger, bottom),
            Err(KinshipError::TraversalDepthExceeded { start, .. }) if start == bottom
        ));
        // Within the ceiling the answer is still found.
        assert!(is_ancestor_or_self(&store, bottom, bottom).expect("check"));
    }
}
