#![no_std]
// Boot crate — staging area for a native bootloader.
// Today Limine does the heavy lifting:
// 1. Enter long mode, build page tables (HHDM + kernel higher half)
// 2. Collect the memory map, framebuffer, and boot modules
// 3. Jump to kmain in the kernel crate
