//! Material texture kinds and the texture-slot binding convention.
//!
//! A mesh carries any number of material textures. Shaders declare a fixed set
//! of samplers named after the texture kind and a 1-based index, e.g.
//! `material.texture_diffuse1` or `material.texture_specular2`. This module
//! decides which texture lands in which slot ([`plan_bindings`]) and where each
//! slot lives in the shader's bind group ([`SamplerTable`]).

use crate::data_structures::default_textures::DefaultColour;

/// Semantic role of a material texture.
///
/// The declaration order is also the order materials are resolved in and the
/// order fallback textures are assigned in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    Diffuse,
    Specular,
    /// Reflection map, imported from the ambient slot.
    Reflect,
    /// Normal map, imported from the height/bump slot.
    Normal,
    /// Height map, imported from the displacement slot.
    Height,
}

impl TextureKind {
    pub const ALL: [TextureKind; 5] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Reflect,
        TextureKind::Normal,
        TextureKind::Height,
    ];

    pub fn uniform_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Reflect => "texture_reflect",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }

    /// Colour bound when a mesh has no texture of this kind.
    pub fn fallback(self) -> DefaultColour {
        match self {
            TextureKind::Diffuse => DefaultColour::White,
            TextureKind::Normal => DefaultColour::Blue,
            TextureKind::Specular | TextureKind::Reflect | TextureKind::Height => {
                DefaultColour::Black
            }
        }
    }

    /// Colour data is sampled in sRGB; everything else holds linear values.
    pub fn is_srgb(self) -> bool {
        matches!(self, TextureKind::Diffuse)
    }

    fn position(self) -> usize {
        self as usize
    }
}

/// A material texture as referenced by a mesh.
///
/// The handle is shared with the model's texture cache and with every other
/// mesh that references the same file.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureRef<H> {
    pub handle: H,
    pub kind: TextureKind,
    pub path: String,
}

/// What ends up in a sampler slot.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingSource<H> {
    Texture(H),
    Fallback(DefaultColour),
}

/// One texture unit assignment produced by [`plan_bindings`].
#[derive(Clone, Debug, PartialEq)]
pub struct SlotBinding<H> {
    /// Texture unit, counted across all kinds.
    pub unit: u32,
    pub kind: TextureKind,
    /// 1-based index within `kind`.
    pub index: u32,
    pub source: BindingSource<H>,
}

impl<H> SlotBinding<H> {
    /// Shader-side name of the sampler, e.g. `material.texture_diffuse1`.
    pub fn uniform_name(&self) -> String {
        format!("material.{}{}", self.kind.uniform_prefix(), self.index)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, BindingSource::Fallback(_))
    }
}

/// Assign every texture of a mesh to a texture unit and fill the gaps.
///
/// Textures take units `0..n` in list order and count up per kind starting at
/// 1, so the second diffuse texture becomes `texture_diffuse2`. Afterwards each
/// kind without any texture gets its fallback colour at index 1 on the next
/// free unit. Every sampler a material shader may declare at index 1 is thus
/// bound to something.
pub fn plan_bindings<H: Clone>(textures: &[TextureRef<H>]) -> Vec<SlotBinding<H>> {
    let mut next_index = [1u32; TextureKind::ALL.len()];
    let mut bindings = Vec::with_capacity(textures.len() + TextureKind::ALL.len());

    for (unit, texture) in textures.iter().enumerate() {
        let counter = &mut next_index[texture.kind.position()];
        bindings.push(SlotBinding {
            unit: unit as u32,
            kind: texture.kind,
            index: *counter,
            source: BindingSource::Texture(texture.handle.clone()),
        });
        *counter += 1;
    }

    let mut unit = textures.len() as u32;
    for kind in TextureKind::ALL {
        if next_index[kind.position()] == 1 {
            bindings.push(SlotBinding {
                unit,
                kind,
                index: 1,
                source: BindingSource::Fallback(kind.fallback()),
            });
            unit += 1;
        }
    }

    bindings
}

/// Binding numbers of one sampler slot inside the material bind group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerLocation {
    pub texture: u32,
    pub sampler: u32,
}

/// The sampler slots a material shader declares, resolved to bind group entries.
///
/// Slot `n` of the table occupies bindings `2n` (texture) and `2n + 1`
/// (sampler). The table is built once together with the pipeline so drawing
/// never formats uniform names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerTable {
    slots: Vec<(TextureKind, u32)>,
}

impl SamplerTable {
    /// Declare `count` slots for each listed kind, in the given order.
    pub fn new(per_kind: &[(TextureKind, u32)]) -> Self {
        let slots = per_kind
            .iter()
            .flat_map(|&(kind, count)| (1..=count).map(move |index| (kind, index)))
            .collect();
        Self { slots }
    }

    /// One slot per kind, which is what the bundled `model.wgsl` declares.
    pub fn standard() -> Self {
        Self::new(&TextureKind::ALL.map(|kind| (kind, 1)))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn location(&self, kind: TextureKind, index: u32) -> Option<SamplerLocation> {
        self.slots
            .iter()
            .position(|&slot| slot == (kind, index))
            .map(Self::location_of)
    }

    /// All slots with their locations in binding order.
    pub fn slots(&self) -> impl Iterator<Item = (TextureKind, u32, SamplerLocation)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(n, &(kind, index))| (kind, index, Self::location_of(n)))
    }

    fn location_of(n: usize) -> SamplerLocation {
        let n = n as u32;
        SamplerLocation {
            texture: 2 * n,
            sampler: 2 * n + 1,
        }
    }
}

/// Pick the source for every slot of `table` given a mesh's binding plan.
///
/// Slots the plan does not cover receive the kind's fallback colour. Plan
/// entries with no matching slot are left out, the shader never samples them.
pub fn resolve_slots<H: Clone>(
    table: &SamplerTable,
    plan: &[SlotBinding<H>],
) -> Vec<(SamplerLocation, SlotBinding<H>)> {
    table
        .slots()
        .map(|(kind, index, location)| {
            let binding = plan
                .iter()
                .find(|binding| binding.kind == kind && binding.index == index)
                .cloned()
                .unwrap_or_else(|| SlotBinding {
                    unit: location.texture / 2,
                    kind,
                    index,
                    source: BindingSource::Fallback(kind.fallback()),
                });
            (location, binding)
        })
        .collect()
}
