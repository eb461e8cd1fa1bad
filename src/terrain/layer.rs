//! Texture layers and the per-patch sampler slot table.

use crate::assets::TextureCache;
use crate::error::{Result, TerrainError};
use crate::material::SamplerBinding;
use glam::Vec2;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Color channel of a blend texture that masks a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendChannel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
}

impl BlendChannel {
    /// Channel index 0-3 as used by the terrain shader.
    pub fn index(&self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Alpha => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Red),
            1 => Some(Self::Green),
            2 => Some(Self::Blue),
            3 => Some(Self::Alpha),
            _ => None,
        }
    }

    /// Parse from the first character: `R/G/B/A` (any case) or `0-3`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().chars().next()?.to_ascii_uppercase() {
            'R' | '0' => Some(Self::Red),
            'G' | '1' => Some(Self::Green),
            'B' | '2' => Some(Self::Blue),
            'A' | '3' => Some(Self::Alpha),
            _ => None,
        }
    }
}

/// Stable handle to a sampler slot.
///
/// The generation guards against a freed slot being reused by a different
/// texture while an old handle is still around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId {
    index: usize,
    generation: u32,
}

impl SamplerId {
    /// Slot index, used as the sampler array index in the shader.
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug)]
enum Slot {
    Occupied {
        generation: u32,
        sampler: SamplerBinding,
        ref_count: usize,
    },
    Vacant {
        generation: u32,
    },
}

/// Reference-counted sampler slots with first-fit reuse of freed slots.
#[derive(Debug, Default)]
pub struct SamplerTable {
    slots: Vec<Slot>,
    free: BTreeSet<usize>,
}

impl SamplerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a sampler for `path`, sharing an existing slot for the same texture.
    pub fn acquire(&mut self, cache: &mut TextureCache, path: &str) -> Result<SamplerId> {
        let texture = cache.acquire(path)?;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied {
                generation,
                sampler,
                ref_count,
            } = slot
            {
                if Rc::ptr_eq(&sampler.texture, &texture) {
                    // The slot already holds a cache reference for this texture.
                    cache.release(path);
                    *ref_count += 1;
                    return Ok(SamplerId {
                        index,
                        generation: *generation,
                    });
                }
            }
        }

        let sampler = SamplerBinding::repeat(texture);
        if let Some(index) = self.free.pop_first() {
            let generation = match self.slots[index] {
                Slot::Vacant { generation } => generation,
                Slot::Occupied { .. } => {
                    return Err(TerrainError::TextureLoad(format!(
                        "sampler slot {} is on the free list but occupied",
                        index
                    )));
                }
            };
            self.slots[index] = Slot::Occupied {
                generation,
                sampler,
                ref_count: 1,
            };
            return Ok(SamplerId { index, generation });
        }

        self.slots.push(Slot::Occupied {
            generation: 0,
            sampler,
            ref_count: 1,
        });
        Ok(SamplerId {
            index: self.slots.len() - 1,
            generation: 0,
        })
    }

    /// Drop one reference. Returns true if the slot was freed.
    pub fn release(&mut self, cache: &mut TextureCache, id: SamplerId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index) else {
            return false;
        };
        let Slot::Occupied {
            generation,
            sampler,
            ref_count,
        } = slot
        else {
            return false;
        };
        if *generation != id.generation {
            log::warn!("Stale sampler handle for slot {}", id.index);
            return false;
        }

        *ref_count -= 1;
        if *ref_count > 0 {
            return false;
        }

        cache.release(sampler.path());
        let next = generation.wrapping_add(1);
        *slot = Slot::Vacant { generation: next };
        self.free.insert(id.index);
        true
    }

    pub fn get(&self, id: SamplerId) -> Option<&SamplerBinding> {
        match self.slots.get(id.index)? {
            Slot::Occupied {
                generation, sampler, ..
            } if *generation == id.generation => Some(sampler),
            _ => None,
        }
    }

    /// Number of layers referencing the slot (0 for stale handles).
    pub fn ref_count(&self, id: SamplerId) -> usize {
        match self.slots.get(id.index) {
            Some(Slot::Occupied {
                generation,
                ref_count,
                ..
            }) if *generation == id.generation => *ref_count,
            _ => 0,
        }
    }

    /// Total slots, including freed ones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of occupied slots.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// One entry per slot, `None` for freed slots.
    pub fn bindings(&self) -> Vec<Option<SamplerBinding>> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Occupied { sampler, .. } => Some(sampler.clone()),
                Slot::Vacant { .. } => None,
            })
            .collect()
    }
}

/// One textured layer of a patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Blend order; lower indices are drawn underneath.
    pub index: usize,
    pub texture: SamplerId,
    pub blend: Option<SamplerId>,
    pub texture_repeat: Vec2,
    pub blend_channel: BlendChannel,
}
