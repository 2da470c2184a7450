use crate::{Bank, Pc080sn};

impl Pc080sn {
    pub fn dump_registers(&self, mut callback: impl FnMut(&str, &[(&str, &str)])) {
        callback("Configuration", &[
            ("Layout", &self.config.layout.to_string()),
            ("X offset", &self.config.x_offset.to_string()),
            ("Y offset", &self.config.y_offset.to_string()),
            ("Y scroll inverted", bool_str(self.config.y_invert)),
            ("Road colors enabled", bool_str(self.road_colors)),
        ]);

        for bank in Bank::ALL {
            callback(&format!("{bank} scroll"), &[
                ("X scroll register", &format!("${:04X}", self.registers.x_scroll(bank))),
                ("Y scroll register", &format!("${:04X}", self.registers.y_scroll(bank))),
                ("Tilemap X scroll", &self.scroll.x(bank).to_string()),
                ("Tilemap Y scroll", &self.scroll.y(bank).to_string()),
            ]);
        }

        callback("Control", &[
            ("Control register", &format!("${:04X}", self.registers.control())),
            ("Screen flipped", bool_str(self.scroll.flip_screen)),
        ]);
    }
}

fn bool_str(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}
