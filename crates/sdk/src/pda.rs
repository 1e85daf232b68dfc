use solana_program::pubkey::Pubkey;
use whorl_math::{check_tick_spacing, get_tick_array_start_index};
use whorl_types::{
    seeds, Direction, Pool, TickArray, WhorlResult, MAX_SWAP_TICK_ARRAYS, MAX_TICK_INDEX, MIN_TICK_INDEX,
};

/// Derive a tick array PDA; the start index is seeded as its decimal string
pub fn derive_tick_array(pool: &Pubkey, start_tick_index: i32, program_id: &Pubkey) -> (Pubkey, u8) {
    let start = start_tick_index.to_string();
    Pubkey::find_program_address(
        &[seeds::TICK_ARRAY, pool.as_ref(), start.as_bytes()],
        program_id,
    )
}

/// Derive a position PDA from its position mint
pub fn derive_position(position_mint: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[seeds::POSITION, position_mint.as_ref()], program_id)
}

/// Start indexes of the tick arrays a swap from `tick_current_index` walks through.
///
/// The first array is the one holding `tick_current_index`, shifted up by one
/// spacing for B to A swaps since those search strictly above the current
/// tick. Following arrays step away in the swap direction and stop at the edge
/// of the tick domain, so fewer than three starts may be returned.
pub fn swap_tick_array_start_indexes(
    tick_current_index: i32,
    tick_spacing: u16,
    direction: Direction,
) -> WhorlResult<Vec<i32>> {
    check_tick_spacing(tick_spacing)?;
    let ticks_in_array = TickArray::ticks_spanned(tick_spacing);
    let shift = match direction {
        Direction::AtoB => 0,
        Direction::BtoA => tick_spacing as i32,
    };
    let min_start = get_tick_array_start_index(MIN_TICK_INDEX, tick_spacing);
    let first = get_tick_array_start_index(tick_current_index + shift, tick_spacing);

    Ok((0..MAX_SWAP_TICK_ARRAYS as i32)
        .map(|offset| match direction {
            Direction::AtoB => first - offset * ticks_in_array,
            Direction::BtoA => first + offset * ticks_in_array,
        })
        .take_while(|start| *start >= min_start && *start <= MAX_TICK_INDEX)
        .collect())
}

/// Tick array addresses, paired with their start index, for a swap on `pool`
pub fn swap_tick_array_addresses(
    pool: &Pool,
    direction: Direction,
    program_id: &Pubkey,
) -> WhorlResult<Vec<(i32, Pubkey)>> {
    Ok(swap_tick_array_start_indexes(pool.tick_current_index, pool.tick_spacing, direction)?
        .into_iter()
        .map(|start| (start, derive_tick_array(&pool.address, start, program_id).0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use whorl_types::WhorlError;

    #[test]
    fn test_swap_starts_follow_direction() {
        assert_eq!(
            swap_tick_array_start_indexes(0, 64, Direction::AtoB).unwrap(),
            vec![0, -5632, -11264]
        );
        assert_eq!(
            swap_tick_array_start_indexes(0, 64, Direction::BtoA).unwrap(),
            vec![0, 5632, 11264]
        );
        // The B to A shift moves into the next array at the upper edge
        assert_eq!(
            swap_tick_array_start_indexes(5631 - 63, 64, Direction::BtoA).unwrap()[0],
            5632
        );
        assert_eq!(
            swap_tick_array_start_indexes(-1, 64, Direction::AtoB).unwrap()[0],
            -5632
        );
    }

    #[test]
    fn test_swap_starts_stop_at_domain_edge() {
        let near_max = swap_tick_array_start_indexes(MAX_TICK_INDEX - 10, 64, Direction::BtoA).unwrap();
        assert_eq!(near_max.len(), 1);
        let near_min = swap_tick_array_start_indexes(MIN_TICK_INDEX + 10, 64, Direction::AtoB).unwrap();
        assert_eq!(near_min.len(), 1);
    }

    #[test]
    fn test_zero_spacing_rejected() {
        assert_eq!(
            swap_tick_array_start_indexes(0, 0, Direction::AtoB),
            Err(WhorlError::InvalidTickSpacing { tick_spacing: 0 })
        );
    }

    #[test]
    fn test_tick_array_address_is_deterministic() {
        let program_id = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let (first, _) = derive_tick_array(&pool, -5632, &program_id);
        let (again, _) = derive_tick_array(&pool, -5632, &program_id);
        let (other, _) = derive_tick_array(&pool, 0, &program_id);
        assert_eq!(first, again);
        assert_ne!(first, other);
        let (position, _) = derive_position(&Pubkey::new_unique(), &program_id);
        assert_ne!(position, first);
    }
}
