//! Predicate role matching against closed vocabularies.
//!
//! Real-world annotation graphs do not share a fixed predicate vocabulary:
//! one model says `hasSourceParticipant`, another `has_source_participant`,
//! a third something merely synonymous. The [`RoleMatcher`] is the sole
//! gateway between that open world and the closed role enumerations the
//! interpreter works with: a predicate's final segment is converted to words
//! and scored against each vocabulary's canonical phrases through the
//! injected similarity oracle.
//!
//! All template embeddings are computed once at construction; predicates are
//! memoized for the lifetime of the matcher (one run), never across runs.

use std::sync::Arc;

use dashmap::DashMap;

use crate::node::segment_to_text;
use crate::oracle::{Embedding, SimilarityOracle};

/// Default similarity threshold for accepting a role match.
pub const DEFAULT_THRESHOLD: f32 = 0.55;

/// A closed role vocabulary with canonical phrases.
pub trait RoleVocab: Copy + Eq + Sized + 'static {
    /// Every role in the vocabulary, in declaration order. Declaration order
    /// is the tie-break order: when two roles score identically the earlier
    /// one wins.
    const ALL: &'static [Self];

    /// Canonical phrase for this role.
    fn phrase(self) -> &'static str;

    #[doc(hidden)]
    fn bank(matcher: &RoleMatcher) -> &[Embedding];
}

macro_rules! role_vocab {
    ($(#[$meta:meta])* $name:ident, $field:ident, { $($(#[$vmeta:meta])* $variant:ident => $phrase:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl RoleVocab for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn phrase(self) -> &'static str {
                match self {
                    $(Self::$variant => $phrase),+
                }
            }

            fn bank(matcher: &RoleMatcher) -> &[Embedding] {
                &matcher.$field
            }
        }
    };
}

role_vocab!(
    /// Participant roles attaching entities to a physical process.
    ParticipantRole, participant, {
        Sink => "has sink participant",
        Source => "has source participant",
        Mediator => "has mediator participant",
    }
);

role_vocab!(
    /// Dereference from a participant wrapper to the real physical entity.
    EntityRefRole, entity_ref, {
        HasPhysicalEntityReference => "has physical entity reference",
    }
);

role_vocab!(
    /// Property attachment, in either direction.
    PropertyRole, property, {
        IsPropertyOf => "is property of",
        HasProperty => "has property",
    }
);

role_vocab!(
    /// Identity roles binding a node to an ontology term or model variable.
    IdentityRole, identity, {
        Is => "is",
        IsVersionOf => "is version of",
        HasVersion => "has version",
        HasPhysicalDefinition => "has physical definition",
        IsComputationalComponentFor => "is computational component for",
    }
);

role_vocab!(
    /// Mereology roles for anatomical context.
    PartRole, part, {
        HasPart => "has part",
        IsPartOf => "is part of",
    }
);

role_vocab!(
    /// Stoichiometric coefficient attachment.
    CoefficientRole, coefficient, {
        HasMultiplier => "has multiplier",
        HasCoefficient => "has coefficient",
    }
);

/// Maps arbitrary predicates onto closed role vocabularies.
pub struct RoleMatcher {
    oracle: Arc<dyn SimilarityOracle>,
    threshold: f32,
    predicate_memo: DashMap<String, Embedding>,
    participant: Vec<Embedding>,
    entity_ref: Vec<Embedding>,
    property: Vec<Embedding>,
    identity: Vec<Embedding>,
    part: Vec<Embedding>,
    coefficient: Vec<Embedding>,
}

impl RoleMatcher {
    /// Build a matcher, encoding every canonical phrase once up front.
    pub fn new(oracle: Arc<dyn SimilarityOracle>) -> Self {
        fn encode_bank<V: RoleVocab>(oracle: &dyn SimilarityOracle) -> Vec<Embedding> {
            V::ALL.iter().map(|r| oracle.encode(r.phrase())).collect()
        }

        let participant = encode_bank::<ParticipantRole>(oracle.as_ref());
        let entity_ref = encode_bank::<EntityRefRole>(oracle.as_ref());
        let property = encode_bank::<PropertyRole>(oracle.as_ref());
        let identity = encode_bank::<IdentityRole>(oracle.as_ref());
        let part = encode_bank::<PartRole>(oracle.as_ref());
        let coefficient = encode_bank::<CoefficientRole>(oracle.as_ref());

        Self {
            oracle,
            threshold: DEFAULT_THRESHOLD,
            predicate_memo: DashMap::new(),
            participant,
            entity_ref,
            property,
            identity,
            part,
            coefficient,
        }
    }

    /// Override the acceptance threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn oracle(&self) -> &dyn SimilarityOracle {
        self.oracle.as_ref()
    }

    fn predicate_embedding(&self, predicate: &str) -> Embedding {
        if let Some(cached) = self.predicate_memo.get(predicate) {
            return cached.clone();
        }
        let emb = self.oracle.encode(&segment_to_text(predicate));
        self.predicate_memo
            .insert(predicate.to_string(), emb.clone());
        emb
    }

    /// Match a predicate against vocabulary `V` at the configured threshold.
    pub fn match_role<V: RoleVocab>(&self, predicate: &str) -> Option<V> {
        self.match_role_at(predicate, self.threshold)
    }

    /// Match a predicate against vocabulary `V` at an explicit threshold.
    ///
    /// Returns the single highest-scoring role iff its score reaches the
    /// threshold. Scanning uses strict `>`, so an exact tie resolves to the
    /// earlier variant in declaration order.
    pub fn match_role_at<V: RoleVocab>(&self, predicate: &str, threshold: f32) -> Option<V> {
        let emb = self.predicate_embedding(predicate);
        let bank = V::bank(self);

        let mut best: Option<(usize, f32)> = None;
        for (idx, template) in bank.iter().enumerate() {
            let score = self.oracle.similarity(&emb, template);
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((idx, score));
            }
        }

        let (idx, score) = best?;
        (score >= threshold).then(|| V::ALL[idx])
    }
}

impl std::fmt::Debug for RoleMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleMatcher")
            .field("threshold", &self.threshold)
            .field("memoized_predicates", &self.predicate_memo.len())
            .finish()
    }
}
