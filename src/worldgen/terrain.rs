//! Procedural terrain classification
//!
//! Tiles are grouped into bunches of seven (a centre and its ring) that share
//! one noise sample, so terrain comes in patches rather than per-tile
//! speckle. Stages run in a fixed order, each taking its share from the
//! tiles the earlier stages left:
//!
//! 1. sea: the lowest-ranked tiles of the sea noise field
//! 2. mountain: the highest-ranked remaining tiles of a second field
//! 3. forest: the same again with a third field
//! 4. everything left is plains
//!
//! Villages are placed last: one on the origin, the rest at random on dry
//! land with a minimum spacing.

use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::campaign::map::{HexCoord, Locale, Terrain, TileMap};
use crate::core::config::TerrainParams;
use crate::core::error::{GameError, Result};
use crate::worldgen::perlin::TileablePerlin;

/// Number of tiles sharing one noise sample
const BUNCH_SIZE: i32 = 7;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerrainSummary {
    pub sea: usize,
    pub mountain: usize,
    pub forest: usize,
    pub plains: usize,
    pub villages: Vec<HexCoord>,
}

pub struct TerrainGenerator {
    params: TerrainParams,
    seed: u64,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams, seed: u64) -> Self {
        Self { params, seed }
    }

    /// The centre of the bunch `coord` belongs to
    ///
    /// `(x + 3y) mod 7` labels the plane so that every tile labelled 0 is
    /// surrounded by the six other labels. Any other tile has exactly one
    /// neighbour labelled 0, reached by the step whose own label cancels it.
    pub fn bunch_center(coord: HexCoord) -> HexCoord {
        let label = (coord.x + 3 * coord.y).rem_euclid(BUNCH_SIZE);
        if label == 0 {
            return coord;
        }
        let wanted = (BUNCH_SIZE - label) % BUNCH_SIZE;
        coord
            .neighbors()
            .into_iter()
            .find(|n| (n.x - coord.x + 3 * (n.y - coord.y)).rem_euclid(BUNCH_SIZE) == wanted)
            .unwrap_or(coord)
    }

    fn sample(map: &TileMap, noise: &TileablePerlin, coord: HexCoord) -> f64 {
        let center = map.wrap(Self::bunch_center(coord));
        let u = (center.x - map.min_x) as f64 / map.width as f64;
        let v = map.row(&center) as f64 / map.height as f64;
        noise.value(&[u, v])
    }

    /// `pool` ordered by ascending noise; ties fall back to coordinate order
    fn ranked(map: &TileMap, pool: &[HexCoord], frequency: usize, seed: u64) -> Vec<HexCoord> {
        let noise = TileablePerlin::new(&[frequency, frequency], seed);
        let mut scored: Vec<(OrderedFloat<f64>, HexCoord)> = pool
            .iter()
            .map(|&c| (OrderedFloat(Self::sample(map, &noise, c)), c))
            .collect();
        scored.sort();
        scored.into_iter().map(|(_, c)| c).collect()
    }

    fn share(fraction: f64, total: usize, available: usize) -> usize {
        ((fraction * total as f64).round() as usize).min(available)
    }

    /// Classify every tile of `map` and place villages
    ///
    /// Nothing is written to the map unless every stage succeeds.
    pub fn generate(&self, map: &mut TileMap, origin: HexCoord) -> Result<TerrainSummary> {
        let origin = map.tile(&origin)?.coord;
        let p = &self.params;
        let total = map.len();
        let mut pool = map.coords();
        let mut assigned: Vec<(HexCoord, Terrain)> = Vec::with_capacity(total);

        let ranked = Self::ranked(map, &pool, p.sea_frequency, self.seed);
        let sea_count = Self::share(p.sea_fraction, total, ranked.len());
        assigned.extend(ranked[..sea_count].iter().map(|&c| (c, Terrain::Sea)));
        pool = ranked[sea_count..].to_vec();
        tracing::debug!(count = sea_count, "Sea assigned");

        for (terrain, fraction, frequency, seed_offset) in [
            (Terrain::Mountain, p.mountain_fraction, p.mountain_frequency, 1),
            (Terrain::Forest, p.forest_fraction, p.forest_frequency, 2),
        ] {
            let mut ranked = Self::ranked(map, &pool, frequency, self.seed.wrapping_add(seed_offset));
            ranked.reverse();
            let count = Self::share(fraction, total, ranked.len());
            assigned.extend(ranked[..count].iter().map(|&c| (c, terrain)));
            pool = ranked[count..].to_vec();
            tracing::debug!(terrain = terrain.name(), count, "Terrain assigned");
        }
        assigned.extend(pool.iter().map(|&c| (c, Terrain::Plains)));

        // The starting tile is always dry, open ground
        for entry in assigned.iter_mut().filter(|(c, _)| *c == origin) {
            entry.1 = Terrain::Plains;
        }

        let villages = self.place_villages(map, origin, &assigned)?;

        let mut summary = TerrainSummary::default();
        for (coord, terrain) in assigned {
            match terrain {
                Terrain::Sea => summary.sea += 1,
                Terrain::Mountain => summary.mountain += 1,
                Terrain::Forest => summary.forest += 1,
                Terrain::Plains => summary.plains += 1,
            }
            if let Some(tile) = map.get_mut(&coord) {
                tile.terrain = terrain;
                tile.locale = None;
            }
        }
        for village in &villages {
            if let Some(tile) = map.get_mut(village) {
                tile.locale = Some(Locale::Village);
            }
        }
        summary.villages = villages;

        tracing::info!(
            seed = self.seed,
            sea = summary.sea,
            mountain = summary.mountain,
            forest = summary.forest,
            plains = summary.plains,
            villages = summary.villages.len(),
            "Terrain generated"
        );
        Ok(summary)
    }

    fn place_villages(
        &self,
        map: &TileMap,
        origin: HexCoord,
        assigned: &[(HexCoord, Terrain)],
    ) -> Result<Vec<HexCoord>> {
        let p = &self.params;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(3));
        let land: Vec<HexCoord> = assigned
            .iter()
            .filter(|(_, t)| *t != Terrain::Sea)
            .map(|(c, _)| *c)
            .collect();

        let mut villages = vec![origin];
        for _ in 0..p.village_count {
            let mut placed = false;
            if !land.is_empty() {
                for _ in 0..p.placement_attempts {
                    let candidate = land[rng.gen_range(0..land.len())];
                    let spaced = villages
                        .iter()
                        .all(|v| map.distance(v, &candidate) >= p.village_min_distance);
                    if spaced {
                        villages.push(candidate);
                        placed = true;
                        break;
                    }
                }
            }
            if !placed {
                return Err(GameError::GenerationExhausted {
                    stage: "villages",
                    attempts: p.placement_attempts,
                });
            }
        }
        Ok(villages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GameConfig;

    fn generate(seed: u64) -> (TileMap, TerrainSummary) {
        let mut map = TileMap::generate_square(14, 14);
        let generator = TerrainGenerator::new(GameConfig::default().terrain, seed);
        let summary = generator.generate(&mut map, HexCoord::new(0, 0)).unwrap();
        (map, summary)
    }

    #[test]
    fn test_bunch_centers() {
        for x in -10..10 {
            for y in -10..10 {
                let coord = HexCoord::new(x, y);
                let center = TerrainGenerator::bunch_center(coord);
                assert_eq!((center.x + 3 * center.y).rem_euclid(7), 0);
                assert!(center == coord || center.is_adjacent(&coord));
            }
        }
        // Seven tiles share each centre
        let center = HexCoord::new(0, 0);
        for n in center.neighbors() {
            assert_eq!(TerrainGenerator::bunch_center(n), center);
        }
    }

    #[test]
    fn test_stage_shares() {
        let (map, summary) = generate(111);
        // round(0.3 * 196), less one if the origin was forced back to plains
        assert!(summary.sea >= 58 && summary.sea <= 59);
        assert_eq!(summary.mountain + summary.forest + summary.sea + summary.plains, 196);
        assert!(summary.mountain >= 28 && summary.mountain <= 29);
        assert!(summary.forest >= 38 && summary.forest <= 39);
        assert_eq!(map.tiles().filter(|t| t.terrain == Terrain::Sea).count(), summary.sea);
    }

    #[test]
    fn test_origin_is_plains_village() {
        let (map, summary) = generate(111);
        let origin = map.get(&HexCoord::new(0, 0)).unwrap();
        assert_eq!(origin.terrain, Terrain::Plains);
        assert_eq!(origin.locale, Some(Locale::Village));
        assert_eq!(summary.villages[0], HexCoord::new(0, 0));
    }

    #[test]
    fn test_villages_spaced_on_land() {
        let (map, summary) = generate(7);
        assert_eq!(summary.villages.len(), 3);
        for (i, a) in summary.villages.iter().enumerate() {
            assert_ne!(map.get(a).unwrap().terrain, Terrain::Sea);
            for b in &summary.villages[i + 1..] {
                assert!(map.distance(a, b) >= 3);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let (a, sa) = generate(111);
        let (b, sb) = generate(111);
        assert_eq!(sa, sb);
        for coord in a.coords() {
            assert_eq!(a.get(&coord).unwrap().terrain, b.get(&coord).unwrap().terrain);
        }
    }

    #[test]
    fn test_exhaustion_leaves_map_untouched() {
        let mut map = TileMap::generate_square(14, 14);
        let mut params = GameConfig::default().terrain;
        params.village_count = 50;
        params.village_min_distance = 6;
        params.placement_attempts = 20;
        let generator = TerrainGenerator::new(params, 111);

        let result = generator.generate(&mut map, HexCoord::new(0, 0));
        assert!(matches!(
            result,
            Err(GameError::GenerationExhausted { stage: "villages", attempts: 20 })
        ));
        assert!(map.tiles().all(|t| t.terrain == Terrain::Plains && t.locale.is_none()));
    }
}
