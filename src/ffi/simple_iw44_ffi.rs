// Simple FFI bindings for the minimal IW44 bridge
use std::ffi::c_int;

extern "C" {
    fn iw44_encode_slice_simple(
        coeffs: *const i16,
        num_coeffs: c_int,
        width: c_int,
        height: c_int,
        cur_bit: c_int,
        cur_band: c_int,
        quant_lo: *const i32,
        quant_hi: *const i32,
        output_buffer: *mut u8,
        output_size: *mut c_int,
        next_bit: *mut c_int,
        next_band: *mut c_int,
    ) -> c_int;
}

pub struct SimpleIW44Codec {
    pub coeffs: Vec<i16>,
    pub width: i32,
    pub height: i32,
    pub cur_bit: i32,
    pub cur_band: usize,
    pub quant_lo: [i32; 16],
    pub quant_hi: [i32; 10],
}

impl SimpleIW44Codec {
    pub fn new(coeffs: Vec<i16>, width: i32, height: i32, quant_lo: [i32; 16], quant_hi: [i32; 10], starting_bit: i32) -> Self {
        Self {
            coeffs,
            width,
            height,
            cur_bit: starting_bit,
            cur_band: 0,
            quant_lo,
            quant_hi,
        }
    }
    
    /// Drop-in replacement for your Codec::encode_slice method
    pub fn encode_slice<W: std::io::Write>(&mut self, _zp: &mut crate::encode::zc::ZEncoder<W>) -> crate::Result<bool> {
        if self.cur_bit < 0 {
            return Ok(false);
        }
        
        let mut output_buffer = vec![0u8; 4096]; // Reasonable buffer size
        let mut output_size = output_buffer.len() as c_int;
        let mut next_bit = 0;
        let mut next_band = 0;
        
        let result = unsafe {
            iw44_encode_slice_simple(
                self.coeffs.as_ptr(),
                self.coeffs.len() as c_int,
                self.width,
                self.height,
                self.cur_bit,
                self.cur_band as c_int,
                self.quant_lo.as_ptr(),
                self.quant_hi.as_ptr(),
                output_buffer.as_mut_ptr(),
                &mut output_size,
                &mut next_bit,
                &mut next_band,
            )
        };
        
        if result < 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "C++ encoding failed").into());
        }
        
        // Update state
        self.cur_bit = next_bit;
        self.cur_band = next_band as usize;
        
        // TODO: Actually write the output data to the ZEncoder
        // For now, just return whether we have more data
        Ok(result > 0)
    }
}
