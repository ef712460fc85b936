/*
    Totally ordered broadcast for a fixed group of processes.

    One process at a time acts as sequencer. Every broadcast is routed to it,
    numbered, and sent to the whole group; every process delivers strictly in
    sequence order, so all live processes see the same messages in the same
    order. The sequencer is chosen with the Bully algorithm (highest reachable
    id wins) and watched with heartbeats; when it goes quiet for longer than
    the election timeout the survivors elect a new one, which starts a fresh
    numbering epoch.
*/

pub mod common;
pub mod consensus;
pub mod network;
