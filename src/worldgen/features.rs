//! Terrain feature templates
//!
//! A feature map lists, per terrain, decorations drawn on top of the base
//! tile: a placeholder name, an offset from the tile origin and the
//! directions in which the neighbouring tile must share the terrain. The
//! pairing table turns each placeholder into a concrete atlas component for
//! that terrain.

use ahash::AHashMap;
use glam::Vec2;
use serde::Deserialize;
use std::path::Path;

use crate::campaign::map::{Direction, HexCoord, TileMap};
use crate::core::error::{GameError, Result};

/// One decoration slot in a terrain's template
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeaturePlacement {
    pub placeholder: String,
    pub x: f32,
    pub y: f32,
    /// Neighbours that must have the same terrain for the slot to be used
    #[serde(default)]
    pub edges: Vec<Direction>,
}

/// Feature metadata file as produced by the generator tooling
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureMeta {
    #[serde(default)]
    pub feature_maps: AHashMap<String, Vec<FeaturePlacement>>,
    #[serde(default)]
    pub pairings: AHashMap<String, AHashMap<String, String>>,
}

/// A feature resolved for one tile
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFeature {
    pub component: String,
    /// Offset from the tile's origin
    pub offset: Vec2,
}

/// Validated feature templates, read-only once loaded
#[derive(Debug, Clone, Default)]
pub struct FeatureMap {
    meta: FeatureMeta,
}

impl FeatureMap {
    /// Wrap metadata, checking every placeholder has a pairing
    pub fn new(meta: FeatureMeta) -> Result<Self> {
        let map = Self { meta };
        map.validate()?;
        Ok(map)
    }

    pub fn load_from_json(json: &str) -> Result<Self> {
        let meta: FeatureMeta = serde_json::from_str(json)?;
        let map = Self::new(meta)?;
        tracing::debug!(
            terrains = map.meta.feature_maps.len(),
            placements = map.meta.feature_maps.values().map(Vec::len).sum::<usize>(),
            "Loaded feature map"
        );
        Ok(map)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_json(&content)
    }

    fn validate(&self) -> Result<()> {
        for (terrain, placements) in &self.meta.feature_maps {
            for placement in placements {
                self.pairing(terrain, &placement.placeholder)?;
            }
        }
        Ok(())
    }

    fn pairing(&self, terrain: &str, placeholder: &str) -> Result<&str> {
        self.meta
            .pairings
            .get(terrain)
            .and_then(|p| p.get(placeholder))
            .map(String::as_str)
            .ok_or_else(|| GameError::MissingFeaturePairing {
                terrain: terrain.to_string(),
                placeholder: placeholder.to_string(),
            })
    }

    /// Template for a terrain; empty when the terrain has no features
    pub fn placements(&self, terrain: &str) -> &[FeaturePlacement] {
        self.meta
            .feature_maps
            .get(terrain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Features to draw on the tile at `coord`
    ///
    /// A slot is used only if every neighbour named in its edges exists and
    /// has the same terrain as the tile.
    pub fn placements_for(&self, map: &TileMap, coord: HexCoord) -> Result<Vec<PlacedFeature>> {
        let tile = map.tile(&coord)?;
        let terrain = tile.terrain;
        let key = terrain.name();

        let mut placed = Vec::new();
        for placement in self.placements(key) {
            let edges_match = placement.edges.iter().all(|direction| {
                let (dx, dy) = direction.delta();
                map.get(&tile.coord.offset(dx, dy))
                    .is_some_and(|n| n.terrain == terrain)
            });
            if !edges_match {
                continue;
            }
            placed.push(PlacedFeature {
                component: self.pairing(key, &placement.placeholder)?.to_string(),
                offset: Vec2::new(placement.x, placement.y),
            });
        }
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::map::Terrain;

    const META: &str = r#"{
        "feature_maps": {
            "forest": [
                {"placeholder": "tree", "x": 12, "y": 8},
                {"placeholder": "tree", "x": 30, "y": 20, "edges": ["n"]},
                {"placeholder": "bush", "x": 40, "y": 10, "edges": ["ne", "se"]}
            ]
        },
        "pairings": {
            "forest": {"tree": "feature.forest.tree", "bush": "feature.forest.bush"}
        }
    }"#;

    fn forest_map() -> TileMap {
        let mut map = TileMap::generate_square(6, 6);
        for coord in [HexCoord::new(0, 0), HexCoord::new(0, 1), HexCoord::new(1, 0)] {
            map.get_mut(&coord).unwrap().terrain = Terrain::Forest;
        }
        map
    }

    #[test]
    fn test_load_and_lookup() {
        let features = FeatureMap::load_from_json(META).unwrap();
        assert_eq!(features.placements("forest").len(), 3);
        assert_eq!(features.placements("forest")[1].edges, vec![Direction::North]);
        assert!(features.placements("sea").is_empty());
    }

    #[test]
    fn test_missing_pairing_rejected_at_load() {
        let json = r#"{
            "feature_maps": {"mountain": [{"placeholder": "peak", "x": 0, "y": 0}]},
            "pairings": {"mountain": {}}
        }"#;
        let result = FeatureMap::load_from_json(json);
        assert!(matches!(
            result,
            Err(GameError::MissingFeaturePairing { ref terrain, ref placeholder })
                if terrain == "mountain" && placeholder == "peak"
        ));
    }

    #[test]
    fn test_edge_conditions() {
        let features = FeatureMap::load_from_json(META).unwrap();
        let map = forest_map();

        // (0,0): north (0,1) and north-east (1,0) are forest, south-east (1,-1) is not
        let placed = features.placements_for(&map, HexCoord::new(0, 0)).unwrap();
        assert_eq!(
            placed,
            vec![
                PlacedFeature {
                    component: "feature.forest.tree".into(),
                    offset: Vec2::new(12.0, 8.0),
                },
                PlacedFeature {
                    component: "feature.forest.tree".into(),
                    offset: Vec2::new(30.0, 20.0),
                },
            ]
        );

        // (1,0) has no forest to the north
        let placed = features.placements_for(&map, HexCoord::new(1, 0)).unwrap();
        assert_eq!(placed.len(), 1);
    }

    #[test]
    fn test_plain_tiles_have_no_features() {
        let features = FeatureMap::load_from_json(META).unwrap();
        let map = forest_map();
        assert!(features
            .placements_for(&map, HexCoord::new(-2, 1))
            .unwrap()
            .is_empty());
        assert!(matches!(
            features.placements_for(&map, HexCoord::new(0, 40)),
            Err(GameError::NoSuchTile { .. })
        ));
    }
}
