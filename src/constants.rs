/// BMP 文件头 (14 字节) 加 BITMAPINFOHEADER (40 字节) 的总大小 (字节)。
/// 头部按紧凑布局一次性读出，字段之间没有填充。
pub const BMP_HEADER_SIZE: usize = 54;

/// BITMAPINFOHEADER 本身的大小，用于构造新的位图头部。
pub const BMP_INFO_HEADER_SIZE: u32 = 40;

/// 位图文件开头的魔数 "BM"。
pub const BMP_MAGIC: [u8; 2] = *b"BM";

/// 唯一支持的色深。
pub const BITS_PER_PIXEL: u16 = 24;

/// 24 位色深下每个像素占用的字节数 (B, G, R)。
pub const BYTES_PER_PIXEL: usize = 3;

/// 每一行像素数据在文件中必须对齐到的字节边界。
pub const ROW_ALIGNMENT: usize = 4;

/// 长度前缀占用的字节数。
/// 长度以小端 `u32` 存储，因此需要 4 * 8 = 32 个可用像素字节来隐藏它。
pub const LENGTH_PREFIX_BYTES: usize = size_of::<u32>();

/// 每个数据字节展开后的位数，也就是它占用的可用像素字节数。
pub const BITS_PER_BYTE: usize = 8;
