/*! Builder, IR and analysis tests that exercise several modules together.
 *
 * Unit tests next to each module cover the lattice, memories, transfer rules and the engine in
 * isolation. These build whole functions through the public builder and check what the analysis
 * concludes about them.
 */
