#[cfg(not(feature = "shuttle"))]
mod table;

#[cfg(feature = "shuttle")]
mod interleavings;
