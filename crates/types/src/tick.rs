/// Tick and tick-array snapshots

use crate::{WhorlError, WhorlResult, NUM_REWARDS, TICK_ARRAY_SIZE, TICK_ARRAY_SIZE_I32};
use serde::{Deserialize, Serialize};

/// State stored at a single tick boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tick {
    pub initialized: bool,
    /// Signed liquidity added when the price crosses this tick moving up
    pub liquidity_net: i128,
    /// Total liquidity referencing this tick; bookkeeping only
    pub liquidity_gross: u128,
    pub fee_growth_outside_a: u128,
    pub fee_growth_outside_b: u128,
    pub reward_growths_outside: [u128; NUM_REWARDS],
}

/// Fixed-size window of contiguous ticks starting at `start_tick_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickArray {
    pub start_tick_index: i32,
    pub ticks: Vec<Tick>,
}

impl TickArray {
    /// Build an array, rejecting anything but `TICK_ARRAY_SIZE` ticks
    pub fn new(start_tick_index: i32, ticks: Vec<Tick>) -> WhorlResult<Self> {
        let array = Self {
            start_tick_index,
            ticks,
        };
        array.validate()?;
        Ok(array)
    }

    /// Array with no initialized ticks, used where the account does not exist
    pub fn empty(start_tick_index: i32) -> Self {
        Self {
            start_tick_index,
            ticks: vec![Tick::default(); TICK_ARRAY_SIZE],
        }
    }

    pub fn validate(&self) -> WhorlResult<()> {
        if self.ticks.len() != TICK_ARRAY_SIZE {
            return Err(WhorlError::InvalidTickArray {
                start_tick_index: self.start_tick_index,
                reason: format!("expected {} ticks, got {}", TICK_ARRAY_SIZE, self.ticks.len()),
            });
        }
        Ok(())
    }

    /// Number of tick indexes covered by one array
    pub fn ticks_spanned(tick_spacing: u16) -> i32 {
        TICK_ARRAY_SIZE_I32 * tick_spacing as i32
    }

    /// Whether `tick_index` falls inside this array's window
    pub fn contains(&self, tick_index: i32, tick_spacing: u16) -> bool {
        tick_index >= self.start_tick_index
            && tick_index < self.start_tick_index + Self::ticks_spanned(tick_spacing)
    }

    /// Tick at `tick_index`, which must be an initializable index inside the window
    pub fn tick(&self, tick_index: i32, tick_spacing: u16) -> WhorlResult<&Tick> {
        let offset = self.tick_offset(tick_index, tick_spacing)?;
        self.ticks.get(offset).ok_or(WhorlError::InvalidTickArray {
            start_tick_index: self.start_tick_index,
            reason: format!("no tick at offset {}", offset),
        })
    }

    /// Offset of `tick_index` inside this array
    pub fn tick_offset(&self, tick_index: i32, tick_spacing: u16) -> WhorlResult<usize> {
        if tick_spacing == 0 {
            return Err(WhorlError::InvalidTickSpacing { tick_spacing });
        }
        let spacing = tick_spacing as i32;
        if !self.contains(tick_index, tick_spacing) || tick_index.rem_euclid(spacing) != 0 {
            return Err(WhorlError::InvalidTickArray {
                start_tick_index: self.start_tick_index,
                reason: format!("tick {} is not addressable with spacing {}", tick_index, spacing),
            });
        }
        Ok(((tick_index - self.start_tick_index) / spacing) as usize)
    }

    /// Count of initialized ticks
    pub fn initialized_count(&self) -> usize {
        self.ticks.iter().filter(|t| t.initialized).count()
    }
}
