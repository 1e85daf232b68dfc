//! Ordered window of tick arrays walked by the swap simulator

use whorl_math::{get_initializable_tick_index, get_next_initializable_tick_index, get_tick_array_start_index};
use whorl_types::{
    Direction, Tick, TickArray, WhorlError, WhorlResult, MAX_TICK_INDEX, MIN_TICK_INDEX,
};

/// Contiguous, sorted tick arrays of one pool
#[derive(Debug, Clone)]
pub struct TickArraySequence<'a> {
    arrays: Vec<&'a TickArray>,
    tick_spacing: u16,
}

impl<'a> TickArraySequence<'a> {
    /// Sort `arrays` by start index and check that they form one gap-free window
    pub fn new(arrays: &'a [TickArray], tick_spacing: u16) -> WhorlResult<Self> {
        if tick_spacing == 0 {
            return Err(WhorlError::InvalidTickSpacing { tick_spacing });
        }
        if arrays.is_empty() {
            return Err(WhorlError::invalid_sequence("no tick arrays supplied"));
        }

        let ticks_in_array = TickArray::ticks_spanned(tick_spacing);
        let mut sorted: Vec<&TickArray> = arrays.iter().collect();
        sorted.sort_by_key(|array| array.start_tick_index);

        for array in &sorted {
            array.validate()?;
            if array.start_tick_index.rem_euclid(ticks_in_array) != 0 {
                return Err(WhorlError::InvalidTickArray {
                    start_tick_index: array.start_tick_index,
                    reason: format!("start is not a multiple of {}", ticks_in_array),
                });
            }
        }

        for pair in sorted.windows(2) {
            let (prev, next) = (pair[0].start_tick_index, pair[1].start_tick_index);
            if next == prev {
                return Err(WhorlError::invalid_sequence(&format!("duplicate tick array at {}", prev)));
            }
            if next != prev + ticks_in_array {
                return Err(WhorlError::invalid_sequence(&format!(
                    "gap between tick arrays at {} and {}",
                    prev, next
                )));
            }
        }

        Ok(Self {
            arrays: sorted,
            tick_spacing,
        })
    }

    pub fn tick_spacing(&self) -> u16 {
        self.tick_spacing
    }

    /// First tick index covered by the window
    pub fn start_index(&self) -> i32 {
        self.arrays.first().map(|a| a.start_tick_index).unwrap_or_default()
    }

    /// Last tick index covered by the window
    pub fn end_index(&self) -> i32 {
        let last = self.arrays.last().map(|a| a.start_tick_index).unwrap_or_default();
        last + TickArray::ticks_spanned(self.tick_spacing) - 1
    }

    /// Start indexes in ascending order
    pub fn start_indexes(&self) -> Vec<i32> {
        self.arrays.iter().map(|a| a.start_tick_index).collect()
    }

    /// Check that a swap from `tick_current_index` starts inside the window
    pub fn check_covers(&self, tick_current_index: i32, direction: Direction) -> WhorlResult<()> {
        let shift = match direction {
            Direction::AtoB => 0,
            Direction::BtoA => self.tick_spacing as i32,
        };
        if self.start_index() > tick_current_index + shift || tick_current_index > self.end_index() {
            return Err(WhorlError::invalid_sequence(&format!(
                "window [{}, {}] does not cover current tick {}",
                self.start_index(),
                self.end_index(),
                tick_current_index
            )));
        }
        Ok(())
    }

    /// Tick at an initializable index inside the window
    pub fn tick(&self, tick_index: i32) -> WhorlResult<&'a Tick> {
        let start = get_tick_array_start_index(tick_index, self.tick_spacing);
        let array: &'a TickArray = self
            .arrays
            .iter()
            .copied()
            .find(|a| a.start_tick_index == start)
            .ok_or_else(|| WhorlError::invalid_sequence(&format!("tick {} is outside the window", tick_index)))?;
        array.tick(tick_index, self.tick_spacing)
    }

    /// Nearest initialized tick strictly above `tick_index`.
    ///
    /// Returns the window's upper edge with no tick data when nothing is
    /// initialized before it, and `None` once `tick_index` has reached that edge.
    pub fn next_initialized_tick(&self, tick_index: i32) -> WhorlResult<Option<(Option<&'a Tick>, i32)>> {
        let end = self.end_index();
        if tick_index >= end {
            return Ok(None);
        }

        let spacing = self.tick_spacing as i32;
        let mut candidate = get_next_initializable_tick_index(tick_index, self.tick_spacing).max(
            get_initializable_tick_index(self.start_index(), self.tick_spacing, Some(true)),
        );
        while candidate <= end && candidate <= MAX_TICK_INDEX {
            let tick = self.tick(candidate)?;
            if tick.initialized {
                return Ok(Some((Some(tick), candidate)));
            }
            candidate += spacing;
        }

        Ok(Some((None, end.min(MAX_TICK_INDEX))))
    }

    /// Nearest initialized tick at or below `tick_index`.
    ///
    /// Returns the window's lower edge with no tick data when nothing is
    /// initialized above it, and `None` once `tick_index` has left the window.
    pub fn prev_initialized_tick(&self, tick_index: i32) -> WhorlResult<Option<(Option<&'a Tick>, i32)>> {
        let start = self.start_index();
        if tick_index < start {
            return Ok(None);
        }

        let spacing = self.tick_spacing as i32;
        let mut candidate = get_initializable_tick_index(tick_index.min(self.end_index()), self.tick_spacing, Some(false));
        while candidate >= start && candidate >= MIN_TICK_INDEX {
            let tick = self.tick(candidate)?;
            if tick.initialized {
                return Ok(Some((Some(tick), candidate)));
            }
            candidate -= spacing;
        }

        Ok(Some((None, start.max(MIN_TICK_INDEX))))
    }

    /// Start indexes of the arrays overlapping the ticks between `from` and
    /// `to`, ordered in the swap direction
    pub fn touched_start_indexes(&self, from: i32, to: i32, direction: Direction) -> Vec<i32> {
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        let span = TickArray::ticks_spanned(self.tick_spacing);
        let mut touched: Vec<i32> = self
            .arrays
            .iter()
            .map(|a| a.start_tick_index)
            .filter(|start| *start <= high && start + span - 1 >= low)
            .collect();
        if direction.is_a_to_b() {
            touched.reverse();
        }
        touched
    }
}
