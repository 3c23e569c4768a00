//! Selection of the best-ranked option among those which pass the constraints.
use rand::Rng;

/// Choose the option with the lowest rank.
///
/// Ties are broken by sampling uniformly at random. Returns `None` if there are no options.
pub fn select_best<T, R>(options: impl IntoIterator<Item = (u32, T)>, rng: &mut R) -> Option<T>
where
    R: Rng + ?Sized,
{
    let options: Vec<_> = options.into_iter().collect();
    let best = options.iter().map(|(rank, _)| *rank).min()?;
    let mut tied: Vec<_> = options
        .into_iter()
        .filter(|(rank, _)| *rank == best)
        .map(|(_, option)| option)
        .collect();

    let index = rng.gen_range(0..tied.len());
    Some(tied.swap_remove(index))
}
