use crate::ledger::{Amount, Player};

pub const MIN_TILE_PX: f64 = 200.0;
pub const MAX_TILE_PX: f64 = 1000.0;

pub const PALETTE: [&str; 7] = [
    "#FFB6C1", "#87CEFA", "#90EE90", "#FFD700", "#FFA07A", "#9370DB", "#20B2AA",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Tile<'a> {
    pub name: &'a str,
    pub balance: Amount,
    pub size_px: f64,
    pub color: &'static str,
}

/// Edge length of a player's island: its share of all coins mapped onto
/// `MAX_TILE_PX`, never below `MIN_TILE_PX`.
pub fn tile_size(balance: Amount, total: u128) -> f64 {
    if total == 0 {
        return MIN_TILE_PX;
    }
    let share = balance as f64 / total as f64;
    (share * MAX_TILE_PX).max(MIN_TILE_PX)
}

pub fn layout(players: &[Player]) -> Vec<Tile<'_>> {
    let total: u128 = players.iter().map(|p| u128::from(p.balance)).sum();
    players
        .iter()
        .enumerate()
        .map(|(idx, player)| Tile {
            name: &player.name,
            balance: player.balance,
            size_px: tile_size(player.balance, total),
            color: PALETTE[idx % PALETTE.len()],
        })
        .collect()
}
