//! Peripheral groups handed to the tasks, and the interrupt bindings.
use assign_resources::assign_resources;
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{I2C0, PIO0, PIO1};
use embassy_rp::pio::InterruptHandler;
use embassy_rp::{Peri, bind_interrupts, peripherals};

// group the peripherals into resources, split in main.rs
assign_resources! {
    wifi: WifiResources {
        pwr_pin: PIN_23,
        cs_pin: PIN_25,
        pio_sm: PIO0,
        dio_pin: PIN_24,
        clk_pin: PIN_29,
        dma_ch: DMA_CH0,
    },
    display: DisplayResources {
        scl: PIN_13,
        sda: PIN_12,
        i2c0: I2C0,
    },
    knob: KnobResources {
        clk_pin: PIN_2,
        dt_pin: PIN_3,
        button_pin: PIN_4,
        toggle_pin: PIN_5,
    },
    mode: ModeResources {
        portal_pin: PIN_6,
        metadata_pin: PIN_7,
        title_pin: PIN_8,
    },
    boot: BootResources {
        factory_reset_pin: PIN_9,
        reload_streams_pin: PIN_10,
        start_pin: PIN_11,
    },
    audio: AudioResources {
        pio: PIO1,
        dma_ch: DMA_CH2,
        data_pin: PIN_18,
        bit_clock_pin: PIN_19,
        lr_clock_pin: PIN_20,
    },
    flash: FlashResources {
        flash: FLASH,
        dma_ch: DMA_CH1,
    },
    power: PowerResources {
        watchdog: WATCHDOG,
    },
}

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
    PIO1_IRQ_0 => InterruptHandler<PIO1>;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});
