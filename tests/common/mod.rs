//! A minimal Hack machine, just enough to execute generated assembly and
//! inspect the emulated stack in tests.

use std::collections::HashMap;

const RAM_SIZE: usize = 32768;
const VAR_BASE: i16 = 16;

pub struct Machine {
    ram: Vec<i16>,
    rom: Vec<Inst>,
    a: i16,
    d: i16,
    pc: usize,
}

#[derive(Debug, Clone)]
enum Inst {
    A(i16),
    C {
        dest: Dest,
        comp: String,
        jump: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Dest {
    a: bool,
    d: bool,
    m: bool,
}

impl Machine {
    /// Assembles and loads a program. Panics on anything the translator
    /// should never emit.
    pub fn load(asm: &str) -> Machine {
        let lines: Vec<&str> = asm
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("//"))
            .collect();

        // Pass 1: label addresses.
        let mut symbols = predefined_symbols();
        let mut address = 0i16;
        for line in &lines {
            if let Some(label) = line.strip_prefix('(') {
                let label = label.strip_suffix(')').expect("unterminated label");
                assert!(
                    symbols.insert(label.to_string(), address).is_none(),
                    "duplicate label {label}"
                );
            } else {
                address += 1;
            }
        }

        // Pass 2: instructions, allocating variables from 16 up.
        let mut rom = Vec::new();
        let mut next_var = VAR_BASE;
        for line in &lines {
            if line.starts_with('(') {
                continue;
            }
            if let Some(sym) = line.strip_prefix('@') {
                let value = match sym.parse::<i16>() {
                    Ok(n) => n,
                    Err(_) => *symbols.entry(sym.to_string()).or_insert_with(|| {
                        let addr = next_var;
                        next_var += 1;
                        addr
                    }),
                };
                rom.push(Inst::A(value));
            } else {
                rom.push(parse_c(line));
            }
        }

        Machine {
            ram: vec![0; RAM_SIZE],
            rom,
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    /// Runs until the program counter leaves the ROM or the step budget
    /// is spent (programs ending in a halt loop rely on the budget).
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                return;
            }
            self.step();
        }
    }

    pub fn get(&self, address: usize) -> i16 {
        self.ram[address]
    }

    pub fn set(&mut self, address: usize, value: i16) {
        self.ram[address] = value;
    }

    pub fn sp(&self) -> i16 {
        self.ram[0]
    }

    pub fn stack_top(&self) -> i16 {
        self.ram[(self.sp() - 1) as usize]
    }

    fn step(&mut self) {
        match self.rom[self.pc].clone() {
            Inst::A(value) => {
                self.a = value;
                self.pc += 1;
            }
            Inst::C { dest, comp, jump } => {
                let m_addr = (self.a as u16 as usize) & (RAM_SIZE - 1);
                let value = compute(&comp, self.a, self.d, self.ram[m_addr]);
                if dest.m {
                    self.ram[m_addr] = value;
                }
                if dest.a {
                    self.a = value;
                }
                if dest.d {
                    self.d = value;
                }
                let taken = match jump.as_deref() {
                    None => false,
                    Some("JGT") => value > 0,
                    Some("JEQ") => value == 0,
                    Some("JGE") => value >= 0,
                    Some("JLT") => value < 0,
                    Some("JNE") => value != 0,
                    Some("JLE") => value <= 0,
                    Some("JMP") => true,
                    Some(other) => panic!("unknown jump {other}"),
                };
                if taken {
                    self.pc = self.a as u16 as usize;
                } else {
                    self.pc += 1;
                }
            }
        }
    }
}

fn predefined_symbols() -> HashMap<String, i16> {
    let mut symbols = HashMap::new();
    for i in 0..16 {
        symbols.insert(format!("R{i}"), i);
    }
    symbols.insert("SP".to_string(), 0);
    symbols.insert("LCL".to_string(), 1);
    symbols.insert("ARG".to_string(), 2);
    symbols.insert("THIS".to_string(), 3);
    symbols.insert("THAT".to_string(), 4);
    symbols.insert("SCREEN".to_string(), 16384);
    symbols.insert("KBD".to_string(), 24576);
    symbols
}

fn parse_c(line: &str) -> Inst {
    let (rest, jump) = match line.split_once(';') {
        Some((rest, jump)) => (rest, Some(jump.to_string())),
        None => (line, None),
    };
    let (dest, comp) = match rest.split_once('=') {
        Some((dest, comp)) => (
            Dest {
                a: dest.contains('A'),
                d: dest.contains('D'),
                m: dest.contains('M'),
            },
            comp,
        ),
        None => (Dest::default(), rest),
    };
    Inst::C {
        dest,
        comp: comp.to_string(),
        jump,
    }
}

fn compute(comp: &str, a: i16, d: i16, m: i16) -> i16 {
    match comp {
        "0" => 0,
        "1" => 1,
        "-1" => -1,
        "D" => d,
        "A" => a,
        "M" => m,
        "!D" => !d,
        "!A" => !a,
        "!M" => !m,
        "-D" => d.wrapping_neg(),
        "-A" => a.wrapping_neg(),
        "-M" => m.wrapping_neg(),
        "D+1" => d.wrapping_add(1),
        "A+1" => a.wrapping_add(1),
        "M+1" => m.wrapping_add(1),
        "D-1" => d.wrapping_sub(1),
        "A-1" => a.wrapping_sub(1),
        "M-1" => m.wrapping_sub(1),
        "D+A" | "A+D" => d.wrapping_add(a),
        "D+M" | "M+D" => d.wrapping_add(m),
        "D-A" => d.wrapping_sub(a),
        "D-M" => d.wrapping_sub(m),
        "A-D" => a.wrapping_sub(d),
        "M-D" => m.wrapping_sub(d),
        "D&A" | "A&D" => d & a,
        "D&M" | "M&D" => d & m,
        "D|A" | "A|D" => d | a,
        "D|M" | "M|D" => d | m,
        other => panic!("unknown computation {other}"),
    }
}
