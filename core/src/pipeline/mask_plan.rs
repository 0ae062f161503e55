//! Masking-layer sub-draw planning
//!
//! Every surface belongs to a combination of masking layers, decided by its
//! scene layer, its tag, or both. A split replacement pass issues one sub-draw
//! per distinct combination so each sub-draw can write that combination's
//! mask-layer vector. The plan is rebuilt whenever the masking configuration
//! changes and is then shared by every camera.

use decalforge_shared::{LayerMask, MAX_MASKING_LAYERS, MaskMethod, MaskingLayerConfig};
use glam::Vec4;
use smallvec::SmallVec;

/// Tag half of a filter clause
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagMatch {
    /// Tags are ignored
    Any,
    /// Surface tag equals this tag
    Exactly(String),
    /// Surface is untagged or its tag is not in the list
    NoneOf(Vec<String>),
}

impl TagMatch {
    pub fn matches(&self, tag: Option<&str>) -> bool {
        match self {
            TagMatch::Any => true,
            TagMatch::Exactly(t) => tag == Some(t.as_str()),
            TagMatch::NoneOf(list) => tag.is_none_or(|t| !list.iter().any(|l| l == t)),
        }
    }
}

/// `layers ∧ tags`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterClause {
    pub layers: LayerMask,
    pub tags: TagMatch,
}

impl FilterClause {
    pub fn matches(&self, layer: u32, tag: Option<&str>) -> bool {
        self.layers.contains(layer) && self.tags.matches(tag)
    }
}

/// Set of surfaces a sub-draw covers: any clause matching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceFilter {
    clauses: SmallVec<[FilterClause; 2]>,
}

impl SurfaceFilter {
    /// Every surface
    pub fn all() -> Self {
        let mut clauses = SmallVec::new();
        clauses.push(FilterClause {
            layers: LayerMask::ALL,
            tags: TagMatch::Any,
        });
        Self { clauses }
    }

    pub fn from_clauses(clauses: impl IntoIterator<Item = FilterClause>) -> Self {
        Self {
            clauses: clauses.into_iter().collect(),
        }
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn matches(&self, layer: u32, tag: Option<&str>) -> bool {
        self.clauses.iter().any(|c| c.matches(layer, tag))
    }

    /// Union of all scene layers the filter can match
    pub fn layers(&self) -> LayerMask {
        self.clauses
            .iter()
            .fold(LayerMask::NONE, |mask, c| mask.union(c.layers))
    }

    pub fn is_catch_all(&self) -> bool {
        self.clauses
            .iter()
            .any(|c| c.layers == LayerMask::ALL && c.tags == TagMatch::Any)
    }
}

/// One split-pass sub-draw
#[derive(Debug, Clone, PartialEq)]
pub struct SubDraw {
    pub filter: SurfaceFilter,
    /// One component per masking layer, 1.0 where the surfaces belong to it
    pub mask_layers: Vec4,
}

impl SubDraw {
    pub fn catch_all() -> Self {
        Self {
            filter: SurfaceFilter::all(),
            mask_layers: Vec4::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TagClass {
    Any,
    Tag(String),
    Untagged,
}

/// Cached mask → sub-draw mapping
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPassPlan {
    method: MaskMethod,
    sub_draws: Vec<SubDraw>,
}

impl Default for MaskPassPlan {
    fn default() -> Self {
        Self {
            method: MaskMethod::default(),
            sub_draws: vec![SubDraw::catch_all()],
        }
    }
}

impl MaskPassPlan {
    /// Build the plan for a masking configuration.
    ///
    /// Layers past [`MAX_MASKING_LAYERS`] are ignored.
    pub fn build(method: MaskMethod, masking: &[MaskingLayerConfig]) -> Self {
        let masking = &masking[..masking.len().min(MAX_MASKING_LAYERS)];
        if masking.is_empty() {
            return Self {
                method,
                sub_draws: vec![SubDraw::catch_all()],
            };
        }

        let layer_masks: Vec<LayerMask> = masking.iter().map(|m| m.layer_mask()).collect();

        let tag_classes: Vec<TagClass> = if method.uses_tags() {
            let mut tags: Vec<&String> = Vec::new();
            for tag in masking.iter().flat_map(|m| &m.tags) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            tags.into_iter()
                .map(|t| TagClass::Tag(t.clone()))
                .chain(std::iter::once(TagClass::Untagged))
                .collect()
        } else {
            vec![TagClass::Any]
        };
        let all_tags: Vec<String> = tag_classes
            .iter()
            .filter_map(|c| match c {
                TagClass::Tag(t) => Some(t.clone()),
                _ => None,
            })
            .collect();

        // Scene layer classes: each layer on its own, or everything at once
        let layer_classes: Vec<LayerMask> = if method.uses_layers() {
            (0..LayerMask::LAYER_COUNT).map(LayerMask::layer).collect()
        } else {
            vec![LayerMask::ALL]
        };

        // Group (layer, tag) classes by their mask-layer vector, in first-seen order
        let mut groups: Vec<(Vec4, Vec<(LayerMask, &TagClass)>)> = Vec::new();
        for &layers in &layer_classes {
            for class in &tag_classes {
                let mut vector = [0.0f32; 4];
                for (i, masking_layer) in masking.iter().enumerate() {
                    let by_layer = method.uses_layers()
                        && !layers.intersection(layer_masks[i]).is_empty();
                    let by_tag = match class {
                        TagClass::Tag(t) => masking_layer.tags.contains(t),
                        TagClass::Any | TagClass::Untagged => false,
                    };
                    if by_layer || by_tag {
                        vector[i] = 1.0;
                    }
                }
                let vector = Vec4::from_array(vector);
                match groups.iter_mut().find(|(v, _)| *v == vector) {
                    Some((_, members)) => members.push((layers, class)),
                    None => groups.push((vector, vec![(layers, class)])),
                }
            }
        }

        if groups.len() == 1 {
            // Every surface gets the same vector; one catch-all sub-draw
            return Self {
                method,
                sub_draws: vec![SubDraw {
                    filter: SurfaceFilter::all(),
                    mask_layers: groups[0].0,
                }],
            };
        }

        let sub_draws = groups
            .into_iter()
            .map(|(vector, members)| {
                // Merge layers that share a tag class into one clause
                let mut clauses: Vec<(LayerMask, &TagClass)> = Vec::new();
                for (layers, class) in members {
                    match clauses.iter_mut().find(|(_, c)| *c == class) {
                        Some((mask, _)) => *mask = mask.union(layers),
                        None => clauses.push((layers, class)),
                    }
                }
                let filter = SurfaceFilter::from_clauses(clauses.into_iter().map(
                    |(layers, class)| FilterClause {
                        layers,
                        tags: match class {
                            TagClass::Any => TagMatch::Any,
                            TagClass::Tag(t) => TagMatch::Exactly(t.clone()),
                            TagClass::Untagged => TagMatch::NoneOf(all_tags.clone()),
                        },
                    },
                ));
                SubDraw {
                    filter,
                    mask_layers: vector,
                }
            })
            .collect();

        Self { method, sub_draws }
    }

    pub fn method(&self) -> MaskMethod {
        self.method
    }

    pub fn sub_draws(&self) -> &[SubDraw] {
        &self.sub_draws
    }

    /// Mask-layer vector a surface ends up with
    pub fn vector_for(&self, layer: u32, tag: Option<&str>) -> Option<Vec4> {
        self.sub_draws
            .iter()
            .find(|d| d.filter.matches(layer, tag))
            .map(|d| d.mask_layers)
    }
}
